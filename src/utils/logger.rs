//! Logging utilities
//!
//! Subscriber setup for the binary. Engine code only emits `tracing` events.

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
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
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
}

/// Filter directive scoping `level` to this crate's events
fn directive(level: LogLevel) -> String {
    format!("testfleet={}", level.as_str())
}

/// Build the event filter
///
/// An explicit level wins. Without one, `RUST_LOG` is honored when set and
/// valid, falling back to `info`.
fn build_filter(level: Option<LogLevel>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(directive(level)),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(directive(LogLevel::Info))),
    }
}

/// Initialize the logger
///
/// Logs go to stderr so report output on stdout stays machine readable.
pub fn init_logger(level: Option<LogLevel>) {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
