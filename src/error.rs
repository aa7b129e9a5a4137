//! Application-wide error types using thiserror
//!
//! Startup failures and anything bubbling up to `main` are wrapped in
//! AppError. Per-subscription failures never reach this level: the
//! scheduler logs them and keeps going.

use crate::notify::DeliveryError;
use crate::source::SourceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_converts_to_app_error() {
        let source_err = SourceError::Unreachable("timeout".into());
        let app_err: AppError = source_err.into();
        let msg = app_err.to_string();
        assert!(msg.contains("Source error"), "Got: {}", msg);
        assert!(msg.contains("timeout"), "Got: {}", msg);
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
        let err = AppError::Config("missing API key".into());
        assert_eq!(err.to_string(), "Configuration error: missing API key");
    }

    #[test]
    fn test_delivery_error_converts_to_app_error() {
        let err: AppError = DeliveryError::Rejected {
            status: 403,
            description: "bot was blocked by the user".into(),
        }
        .into();
        assert!(err.to_string().contains("blocked"));
    }
}
