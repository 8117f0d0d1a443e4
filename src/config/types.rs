//! Configuration types for the console
//!
//! Loaded from YAML; every section and field has a default so a partial (or
//! missing) file still yields a usable configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::logstream::{DEFAULT_LOG_CAPACITY, DEFAULT_PIN_THRESHOLD};
use crate::error::AppError;

// ============================================================================
// Configuration Structs
// ============================================================================

/// Engine HTTP API connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the engine dashboard API (e.g. `http://127.0.0.1:8000`)
    pub base_url: String,
    /// Whole-request timeout in milliseconds
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_ms: 8_000,
            connect_timeout_ms: 3_000,
        }
    }
}

/// Poll cadence per subsystem, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    pub status_ms: u64,
    pub logs_ms: u64,
    pub usage_ms: u64,
    /// Wallet, KPI, leader and risk stats
    pub bundle_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            status_ms: 2_500,
            logs_ms: 2_500,
            usage_ms: 15_000,
            bundle_ms: 4_000,
        }
    }
}

impl PollingConfig {
    pub fn status(&self) -> Duration {
        Duration::from_millis(self.status_ms)
    }

    pub fn logs(&self) -> Duration {
        Duration::from_millis(self.logs_ms)
    }

    pub fn usage(&self) -> Duration {
        Duration::from_millis(self.usage_ms)
    }

    pub fn bundle(&self) -> Duration {
        Duration::from_millis(self.bundle_ms)
    }
}

/// Log panel behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogPanelConfig {
    /// Lines kept in memory before the oldest is evicted
    pub capacity: usize,
    /// Rows from the bottom still considered "pinned"
    pub pin_threshold: usize,
}

impl Default for LogPanelConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_LOG_CAPACITY,
            pin_threshold: DEFAULT_PIN_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UsageConfig {
    /// Re-log an unchanged quota value after this many seconds
    pub cooldown_secs: u64,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self { cooldown_secs: 60 }
    }
}

impl UsageConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Root configuration (loaded from `console.yaml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub logs: LogPanelConfig,
    pub usage: UsageConfig,
}

impl ConsoleConfig {
    /// Validate configuration rules
    pub fn validate(&self) -> Result<(), AppError> {
        let url = reqwest::Url::parse(&self.api.base_url).map_err(|e| {
            AppError::Config(format!(
                "api.base_url '{}' is not a valid URL: {}",
                self.api.base_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "api.base_url must use http or https (got {})",
                url.scheme()
            )));
        }

        if self.api.timeout_ms == 0 {
            return Err(AppError::Config("api.timeout_ms must be > 0".to_string()));
        }

        for (name, value) in [
            ("status_ms", self.polling.status_ms),
            ("logs_ms", self.polling.logs_ms),
            ("usage_ms", self.polling.usage_ms),
            ("bundle_ms", self.polling.bundle_ms),
        ] {
            if value == 0 {
                return Err(AppError::Config(format!("polling.{} must be > 0", name)));
            }
        }

        if self.logs.capacity == 0 {
            return Err(AppError::Config("logs.capacity must be > 0".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ConsoleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.polling.status(), Duration::from_millis(2_500));
        assert_eq!(config.polling.usage(), Duration::from_secs(15));
        assert_eq!(config.logs.capacity, 400);
        assert_eq!(config.usage.cooldown(), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = ConsoleConfig::default();
        config.polling.bundle_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("polling.bundle_ms"));
    }

    #[test]
    fn test_bad_url_rejected() {
        let mut config = ConsoleConfig::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "ftp://host".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("http or https"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = ConsoleConfig::default();
        config.logs.capacity = 0;
        assert!(config.validate().is_err());
    }
}
