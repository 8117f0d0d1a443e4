//! Configuration loader for YAML files
//!
//! Resolution order: defaults, then the YAML file (if present), then
//! environment overrides. The result is validated before it is returned.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::AppError;

use super::types::ConsoleConfig;

/// Config path used when `CONSOLE_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "console.yaml";

/// Env var naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "CONSOLE_CONFIG";

/// Env var overriding `api.base_url`
pub const API_URL_ENV: &str = "CONSOLE_API_URL";

/// `CONSOLE_CONFIG` or `console.yaml`
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from a YAML file
///
/// A missing file is not an error: defaults are used. Parse errors and
/// validation failures are.
///
/// # Example
/// ```ignore
/// use engine_console::config::{config_path, load_config};
///
/// let config = load_config(&config_path())?;
/// ```
pub fn load_config(path: &Path) -> Result<ConsoleConfig, AppError> {
    let mut config = if path.exists() {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: ConsoleConfig = serde_yaml::from_reader(reader).map_err(|e| {
            AppError::Config(format!("YAML parse error in '{}': {}", path.display(), e))
        })?;
        info!(path = %path.display(), "Config loaded");
        config
    } else {
        debug!(path = %path.display(), "Config file not found, using defaults");
        ConsoleConfig::default()
    };

    apply_env_overrides(&mut config);
    config.validate()?;

    Ok(config)
}

/// Load configuration from a YAML string (no env overrides)
pub fn load_config_from_str(yaml_content: &str) -> Result<ConsoleConfig, AppError> {
    let config: ConsoleConfig = if yaml_content.trim().is_empty() {
        ConsoleConfig::default()
    } else {
        serde_yaml::from_str(yaml_content)
            .map_err(|e| AppError::Config(format!("YAML parse error: {}", e)))?
    };

    config.validate()?;

    Ok(config)
}

fn apply_env_overrides(config: &mut ConsoleConfig) {
    if let Ok(url) = std::env::var(API_URL_ENV) {
        let url = url.trim();
        if !url.is_empty() {
            config.api.base_url = url.to_string();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID_CONFIG_YAML: &str = r#"
api:
  base_url: http://10.0.0.5:8000
  timeout_ms: 5000
polling:
  status_ms: 1000
  usage_ms: 30000
logs:
  capacity: 250
"#;

    #[test]
    fn test_load_config_from_str_valid() {
        let config = load_config_from_str(VALID_CONFIG_YAML).unwrap();
        assert_eq!(config.api.base_url, "http://10.0.0.5:8000");
        assert_eq!(config.api.timeout_ms, 5000);
        assert_eq!(config.polling.status_ms, 1000);
        // Unspecified fields keep their defaults
        assert_eq!(config.polling.logs_ms, 2500);
        assert_eq!(config.api.connect_timeout_ms, 3000);
        assert_eq!(config.logs.capacity, 250);
        assert_eq!(config.logs.pin_threshold, 2);
    }

    #[test]
    fn test_load_config_from_str_empty_is_default() {
        assert_eq!(load_config_from_str("").unwrap(), ConsoleConfig::default());
    }

    #[test]
    fn test_load_config_from_str_invalid_yaml() {
        let result = load_config_from_str("invalid: yaml: content: [");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("YAML parse error"));
    }

    #[test]
    fn test_load_config_from_str_validation_failure() {
        let result = load_config_from_str("polling:\n  logs_ms: 0\n");
        assert!(result.unwrap_err().to_string().contains("polling.logs_ms"));
    }

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() {
        std::env::remove_var(API_URL_ENV);
        let config = load_config(Path::new("/nonexistent/path/console.yaml")).unwrap();
        assert_eq!(config, ConsoleConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_config_from_file_valid() {
        std::env::remove_var(API_URL_ENV);
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(VALID_CONFIG_YAML.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.api.base_url, "http://10.0.0.5:8000");
        assert_eq!(config.polling.usage_ms, 30000);
    }

    #[test]
    #[serial]
    fn test_load_config_from_file_invalid_yaml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"invalid: [yaml: content").unwrap();
        temp_file.flush().unwrap();

        let result = load_config(temp_file.path());
        assert!(result.unwrap_err().to_string().contains("YAML parse error"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_base_url() {
        std::env::set_var(API_URL_ENV, "https://engine.internal:9443");
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(VALID_CONFIG_YAML.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        std::env::remove_var(API_URL_ENV);
        assert_eq!(config.api.base_url, "https://engine.internal:9443");
    }

    #[test]
    #[serial]
    fn test_config_path_env() {
        std::env::remove_var(CONFIG_PATH_ENV);
        assert_eq!(config_path(), PathBuf::from(DEFAULT_CONFIG_PATH));
        std::env::set_var(CONFIG_PATH_ENV, "/etc/console/prod.yaml");
        assert_eq!(config_path(), PathBuf::from("/etc/console/prod.yaml"));
        std::env::remove_var(CONFIG_PATH_ENV);
    }
}
