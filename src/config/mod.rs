//! Configuration module
//!
//! This module provides:
//! - Configuration types (`ConsoleConfig`, `ApiConfig`, `PollingConfig`, ...)
//! - YAML loading with env overrides (`load_config`)
//! - Logging setup (`init_logging`, `LogFormat`)

mod loader;
pub mod logging;
mod types;

pub use types::{ApiConfig, ConsoleConfig, LogPanelConfig, PollingConfig, UsageConfig};

pub use loader::{
    config_path, load_config, load_config_from_str, API_URL_ENV, CONFIG_PATH_ENV,
    DEFAULT_CONFIG_PATH,
};

pub use logging::{init_logging, LogFormat};
