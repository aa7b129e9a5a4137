//! Metrics source error types
//!
//! All data-source failures are wrapped in SourceError so the scheduler can
//! log them and move on to the next subscription.

use thiserror::Error;

/// Errors returned by a `MetricsSource` implementation
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport failure or non-success HTTP status
    #[error("Source unreachable: {0}")]
    Unreachable(String),

    /// Request did not complete within the configured bound
    #[error("Source timeout after {0}ms")]
    Timeout(u64),

    /// Body could not be decoded, or the API reported query errors
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Neither pool nor trade data exists for the token
    #[error("No data available for token {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::InvalidResponse(err.to_string())
        } else {
            SourceError::Unreachable(err.to_string())
        }
    }
}

/// Result type alias for metrics source operations
pub type SourceResult<T> = std::result::Result<T, SourceError>;
