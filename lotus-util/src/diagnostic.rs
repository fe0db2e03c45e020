//! Severity-leveled diagnostics shared by the scanner, parser and evaluator.
//!
//! Every phase reports through the same `Handler` so that the
//! `[<SEVERITY>] message [Line: N]` wire format and the per-phase
//! error/warning counters stay consistent across the pipeline.

use std::cell::Cell;
use std::fmt;

/// Severity of a diagnostic. Ordered from most to least permissive so that
/// `level >= min_level` decides whether a diagnostic is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        };
        f.write_str(s)
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::Warning
    }
}

impl std::str::FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(Level::Info),
            "WARNING" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            _ => Err(()),
        }
    }
}

/// A single reported diagnostic. Kept mostly for the `report_summary` /
/// future-snippet hooks; the common path only needs the formatted line.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub line: Option<u32>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)?;
        if let Some(line) = self.line {
            write!(f, " [Line: {line}]")?;
        }
        Ok(())
    }
}

/// Accumulates per-severity counts and writes filtered diagnostics to
/// stderr as they're reported. Counts are always updated regardless of
/// `min_level` — `LOG_LEVEL` only suppresses *display*, not the abort
/// decision that depends on the real error count.
pub struct Handler {
    min_level: Level,
    info: Cell<u32>,
    warning: Cell<u32>,
    error: Cell<u32>,
}

impl Handler {
    pub fn new(min_level: Level) -> Self {
        Handler { min_level, info: Cell::new(0), warning: Cell::new(0), error: Cell::new(0) }
    }

    pub fn report(&self, level: Level, message: impl Into<String>, line: Option<u32>) {
        let counter = match level {
            Level::Info => &self.info,
            Level::Warning => &self.warning,
            Level::Error => &self.error,
        };
        counter.set(counter.get() + 1);

        if level >= self.min_level {
            let diag = Diagnostic { level, message: message.into(), line };
            eprintln!("{diag}");
        }
    }

    pub fn info(&self, message: impl Into<String>, line: Option<u32>) {
        self.report(Level::Info, message, line)
    }

    pub fn warning(&self, message: impl Into<String>, line: Option<u32>) {
        self.report(Level::Warning, message, line)
    }

    pub fn error(&self, message: impl Into<String>, line: Option<u32>) {
        self.report(Level::Error, message, line)
    }

    pub fn error_count(&self) -> u32 {
        self.error.get()
    }

    pub fn warning_count(&self) -> u32 {
        self.warning.get()
    }

    pub fn info_count(&self) -> u32 {
        self.info.get()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// `[<PHASE>] Errors: N Warnings: M`, gated by the `PRINT_REPORT` config key.
    pub fn report_summary(&self, phase: &str) {
        eprintln!(
            "[{phase}] Errors: {} Warnings: {}",
            self.error_count(),
            self.warning_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_unaffected_by_min_level() {
        let handler = Handler::new(Level::Error);
        handler.warning("unused", None);
        handler.error("boom", Some(3));
        assert_eq!(handler.warning_count(), 1);
        assert_eq!(handler.error_count(), 1);
        assert!(handler.has_errors());
    }

    #[test]
    fn level_ordering_matches_severity() {
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
    }

    #[test]
    fn display_includes_line_when_present() {
        let diag = Diagnostic { level: Level::Error, message: "bad".into(), line: Some(7) };
        assert_eq!(diag.to_string(), "[ERROR] bad [Line: 7]");
    }

    #[test]
    fn display_omits_line_when_absent() {
        let diag = Diagnostic { level: Level::Info, message: "hi".into(), line: None };
        assert_eq!(diag.to_string(), "[INFO] hi");
    }
}
