//! Application-wide error types using thiserror
//!
//! Subsystem errors (`ApiError`, `ValidationError`) convert into `AppError`
//! at the application boundary. Inside the poll loops they are never
//! propagated: they are turned into log panel lines instead.

use crate::api::errors::ApiError;
use crate::core::dispatcher::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Terminal error: {0}")]
    Terminal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_converts_to_app_error() {
        let api_err = ApiError::Transport("connection refused".into());
        let app_err: AppError = api_err.into();
        let msg = app_err.to_string();
        assert!(msg.contains("API error"), "Got: {}", msg);
        assert!(msg.contains("connection refused"), "Got: {}", msg);
    }

    #[test]
    fn test_validation_error_converts_to_app_error() {
        let err = ValidationError::MalformedAddress("0x12".into());
        let app_err: AppError = err.into();
        assert!(app_err.to_string().starts_with("Validation error"));
    }

    #[test]
    fn test_serde_error_converts_to_app_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let app_err: AppError = serde_err.into();
        assert!(app_err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_io_error_converts_to_app_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let app_err: AppError = io_err.into();
        let msg = app_err.to_string();
        assert!(msg.contains("IO error"), "Got: {}", msg);
        assert!(msg.contains("file missing"), "Got: {}", msg);
    }

    #[test]
    fn test_config_error_display() {
        let err = AppError::Config("missing base_url".into());
        assert_eq!(err.to_string(), "Configuration error: missing base_url");
    }
}
