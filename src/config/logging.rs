//! Logging configuration
//!
//! Provides configurable TUI/JSON/Pretty logging output
//!
//! # Environment Variables
//! - `LOG_FORMAT`: `tui` (default), `json` or `pretty`
//! - `RUST_LOG`: Log level filter (default: `info`)
//!
//! In `tui` mode the caller installs the subscriber with `TuiLayer`, since
//! stdout belongs to the terminal UI.

use tracing_subscriber::EnvFilter;

/// Output mode selected by `LOG_FORMAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Tui,
    Json,
    Pretty,
}

impl LogFormat {
    /// Unknown values fall back to the TUI
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Tui,
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|f| Self::parse(&f))
            .unwrap_or(LogFormat::Tui)
    }
}

/// `RUST_LOG` or `info`
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the headless subscriber.
///
/// Must not be called in TUI mode: the TUI sets up its own subscriber.
pub fn init_logging() {
    match LogFormat::from_env() {
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .pretty()
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .json()
                .init();
        }
        LogFormat::Tui => {
            debug_assert!(
                false,
                "init_logging() called in TUI mode: the caller installs TuiLayer instead"
            );
        }
    }
}
