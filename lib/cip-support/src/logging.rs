//! Structured logging setup shared by the device binary and the library crates.
//!
//! Every crate downstream takes a `&slog::Logger` rather than reaching for a global; tests pass
//! `slog::Logger::root(slog::Discard, slog::o!())` so nothing is printed during `cargo test`.

pub use slog::{debug, error, info, o, trace, warn, Logger};

use serdeconv;
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;
use std::path::Path;

/// Logging configuration loaded from the device's TOML config file.
#[derive(serde::Serialize, serde::Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub destination: LogDestination,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogDestination {
    Stdout,
    Stderr,
}

impl Default for LoggingConfig {
    fn default() -> LoggingConfig {
        LoggingConfig {
            level: "info".to_owned(),
            destination: LogDestination::Stderr,
        }
    }
}

impl LoggingConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LoggingConfig, serdeconv::Error> {
        serdeconv::from_toml_file(path)
    }

    /// Build a root `Logger` from this configuration.
    pub fn build(&self) -> Logger {
        let severity = match self.level.to_lowercase().as_str() {
            "trace" => Severity::Trace,
            "debug" => Severity::Debug,
            "warning" | "warn" => Severity::Warning,
            "error" => Severity::Error,
            "critical" => Severity::Critical,
            _ => Severity::Info,
        };

        let mut builder = TerminalLoggerBuilder::new();
        builder.level(severity);
        builder.destination(match self.destination {
            LogDestination::Stdout => Destination::Stdout,
            LogDestination::Stderr => Destination::Stderr,
        });

        builder.build().expect("Failed constructing terminal logger")
    }
}

/// A logger that discards everything; used by library code in tests and by callers who haven't
/// wired up logging yet.
pub fn discard() -> Logger {
    Logger::root(slog::Discard, o!())
}
