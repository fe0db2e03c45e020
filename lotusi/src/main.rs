//! lotusi - the Lotus interpreter CLI.
//!
//! Orchestrates the pipeline described in `spec.md` §2: scan → parse →
//! evaluate, wiring the shared `Handler` through all three phases and
//! translating the result into a process exit code (§6).

mod config;
mod error;

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser as ClapParser;

use config::Config;
use error::{InterpError, Result};
use lotus_eval::Evaluator;
use lotus_lex::Scanner;
use lotus_par::Parser as LotusParser;
use lotus_util::{Handler, Level};

/// Lotus - a small dynamically-typed scripting language.
#[derive(ClapParser, Debug)]
#[command(name = "lotusi", version, about, long_about = None)]
struct Cli {
    /// Path to the Lotus source file to run.
    path: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    install_signal_handler();

    let bootstrap = Handler::new(Level::Warning);
    let config = Config::load(&bootstrap);
    let handler = Handler::new(config.log_level);

    let status = match run(&cli.path, &handler, &config) {
        Ok(()) => 0,
        Err(_) => 1,
    };
    std::process::exit(status);
}

fn run(path: &Path, handler: &Handler, config: &Config) -> Result<()> {
    let source = std::fs::read_to_string(path).map_err(|err| {
        handler.error(format!("cannot read '{}': {err}", path.display()), None);
        InterpError::Io(err)
    })?;

    let tokens = Scanner::new(&source, handler).scan_tokens();
    let program = LotusParser::new(tokens, handler).parse();

    if config.print_report {
        handler.report_summary("lotusi");
    }

    if handler.has_errors() {
        return Err(InterpError::CompileErrors(handler.error_count()));
    }

    let stdout = std::io::stdout();
    let mut evaluator = Evaluator::new(stdout.lock());
    evaluator.run(&program).map_err(|err| {
        handler.error(err.to_string(), err.line());
        InterpError::Runtime(err)
    })
}

/// §5 "Cancellation": installs an external SIGINT/SIGTERM hook that flushes
/// stdout and exits non-zero. The core scanner/parser/evaluator take no
/// dependency on this - it only ever runs between their otherwise
/// uninterruptible single-threaded steps.
fn install_signal_handler() {
    let _ = ctrlc::set_handler(|| {
        let _ = std::io::stdout().flush();
        std::process::exit(130);
    });
}
