//! Logging utilities
//!
//! Provides logging configuration and helpers.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Pick the level from the CLI flag, then `--verbose`, then the environment
    pub fn resolve(flag: Option<&str>, verbose: bool, env: Option<&str>) -> Self {
        flag.and_then(Self::from_str)
            .or(if verbose { Some(LogLevel::Debug) } else { None })
            .or_else(|| env.and_then(Self::from_str))
            .unwrap_or(LogLevel::Info)
    }
}

/// Initialize the logger with specified level. Logs go to stderr so that
/// stdout carries only the report.
pub fn init_logger(level: LogLevel) {
    let filter = EnvFilter::new(format!("testfleet={}", level.to_tracing_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
