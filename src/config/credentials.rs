//! API credentials loaded from environment variables
//!
//! Both credentials are required: the service cannot poll without Bitquery
//! and cannot deliver or receive commands without Telegram.

use thiserror::Error;
use tracing::info;

use crate::core::logging::sanitize;
use crate::error::AppError;

/// Errors for credential loading
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Environment variable {0} contains a placeholder value")]
    Placeholder(String),
}

impl From<CredentialsError> for AppError {
    fn from(err: CredentialsError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Secrets needed at startup
#[derive(Clone)]
pub struct Credentials {
    pub bitquery_api_key: String,
    pub telegram_bot_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bitquery_api_key", &sanitize(&self.bitquery_api_key).to_string())
            .field("telegram_bot_token", &sanitize(&self.telegram_bot_token).to_string())
            .finish()
    }
}

fn required_var(name: &str) -> Result<String, CredentialsError> {
    let value = std::env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CredentialsError::MissingEnvVar(name.to_string()))?;

    if value.starts_with("your-") || value.starts_with("your_") {
        return Err(CredentialsError::Placeholder(name.to_string()));
    }
    Ok(value)
}

impl Credentials {
    /// Load credentials from environment variables
    ///
    /// Required env vars:
    /// - `BITQUERY_API_KEY`
    /// - `TELEGRAM_BOT_TOKEN`
    pub fn from_env() -> Result<Self, CredentialsError> {
        let bitquery_api_key = required_var("BITQUERY_API_KEY")?;
        let telegram_bot_token = required_var("TELEGRAM_BOT_TOKEN")?;

        info!(
            bitquery_api_key = %sanitize(&bitquery_api_key),
            telegram_bot_token = %sanitize(&telegram_bot_token),
            "Credentials loaded"
        );

        Ok(Self {
            bitquery_api_key,
            telegram_bot_token,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
