//! Loads the optional `lotus.conf` key/value file described in §6.
//!
//! Not TOML: the wire format is a bespoke two-key `key=value`-per-line
//! format, so a hand-rolled parser is the right tool here even though the
//! teacher workspace's own `faxt::config` reaches for `toml`+`serde` - that
//! crate pair would be over-engineering for two scalar keys. What's reused
//! from `faxt::config` is the *pattern*: resolve a platform config
//! directory via `dirs`, and fall back to defaults gracefully when nothing
//! is there.

use std::path::PathBuf;

use lotus_util::{Handler, Level};

pub const CONFIG_FILE_NAME: &str = "lotus.conf";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: Level,
    pub print_report: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config { log_level: Level::Warning, print_report: false }
    }
}

impl Config {
    /// Loads `lotus.conf` from the platform config directory. A missing
    /// file is not an error: it's logged at `INFO` through `bootstrap` (a
    /// `Handler` built with the *default* level, since the real level isn't
    /// known until this very load completes - so in practice this message
    /// is never visible unless some other mechanism already raised the
    /// bootstrap handler's level, which nothing in this workspace does).
    pub fn load(bootstrap: &Handler) -> Self {
        let mut config = Config::default();

        let Some(path) = config_path() else {
            return config;
        };

        if !path.exists() {
            bootstrap.info(format!("no config file at {}, using defaults", path.display()), None);
            return config;
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => config.apply(&contents),
            Err(err) => {
                bootstrap.warning(format!("failed to read {}: {err}", path.display()), None);
            }
        }

        config
    }

    fn apply(&mut self, contents: &str) {
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                "LOG_LEVEL" => {
                    if let Ok(level) = value.trim().parse() {
                        self.log_level = level;
                    }
                }
                "PRINT_REPORT" => {
                    self.print_report = value.trim().eq_ignore_ascii_case("TRUE");
                }
                _ => {}
            }
        }
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lotus").join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_warning_with_no_report() {
        let config = Config::default();
        assert_eq!(config.log_level, Level::Warning);
        assert!(!config.print_report);
    }

    #[test]
    fn apply_parses_recognized_keys() {
        let mut config = Config::default();
        config.apply("LOG_LEVEL=INFO\nPRINT_REPORT=TRUE\n");
        assert_eq!(config.log_level, Level::Info);
        assert!(config.print_report);
    }

    #[test]
    fn apply_ignores_blank_lines_comments_and_unknown_keys() {
        let mut config = Config::default();
        config.apply("# a comment\n\nMYSTERY=1\nLOG_LEVEL=ERROR\n");
        assert_eq!(config.log_level, Level::Error);
    }

    #[test]
    fn apply_ignores_malformed_log_level() {
        let mut config = Config::default();
        config.apply("LOG_LEVEL=VERY_LOUD\n");
        assert_eq!(config.log_level, Level::Warning);
    }

    #[test]
    fn print_report_is_case_insensitive() {
        let mut config = Config::default();
        config.apply("PRINT_REPORT=true\n");
        assert!(config.print_report);
    }
}
