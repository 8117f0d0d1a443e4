//! Remote API error types
//!
//! Every failure of a call against the engine API ends up as one of these.
//! The console never propagates them past a subsystem: they become log lines.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport-level failure (DNS, refused connection, TLS, reset)
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Server answered with a non-success status
    #[error("Rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Body was not the JSON shape we expected
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type alias for API operations
pub type ApiResult<T> = std::result::Result<T, ApiError>;
