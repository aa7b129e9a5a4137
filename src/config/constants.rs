//! Application constants and configuration defaults
//!
//! Transport-level knobs that rarely change between deployments. Values can
//! be overridden via environment variables.

use std::time::Duration;

// =============================================================================
// Endpoints
// =============================================================================

/// Bitquery GraphQL endpoint (default: streaming EAP endpoint)
///
/// Environment variable: `BITQUERY_URL`
pub fn bitquery_url() -> String {
    std::env::var("BITQUERY_URL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "https://streaming.bitquery.io/eap".to_string())
}

/// Telegram Bot API base URL (default: <https://api.telegram.org>)
///
/// Environment variable: `TELEGRAM_API_URL`
pub fn telegram_api_url() -> String {
    std::env::var("TELEGRAM_API_URL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "https://api.telegram.org".to_string())
}

// =============================================================================
// Timeouts & Capacities
// =============================================================================

/// HTTP request timeout for outbound API calls (default: 15 seconds)
///
/// Environment variable: `HTTP_REQUEST_TIMEOUT_SECS`
pub fn http_request_timeout() -> Duration {
    let secs = std::env::var("HTTP_REQUEST_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(15);
    Duration::from_secs(secs)
}

/// Telegram getUpdates long-poll duration (default: 25 seconds)
///
/// getUpdates calls carry their own HTTP timeout of this value plus a grace period.
///
/// Environment variable: `TELEGRAM_LONG_POLL_SECS`
pub fn telegram_long_poll_secs() -> u64 {
    std::env::var("TELEGRAM_LONG_POLL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(25)
}

/// Pending notifications buffered between scheduler and delivery (default: 256)
///
/// Environment variable: `NOTIFICATION_CHANNEL_CAPACITY`
pub fn notification_channel_capacity() -> usize {
    std::env::var("NOTIFICATION_CHANNEL_CAPACITY")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(256)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Print all configuration values (for debugging/startup logs)
pub fn log_configuration() {
    tracing::info!("=== Transport Configuration ===");
    tracing::info!("  - Bitquery URL: {}", bitquery_url());
    tracing::info!("  - Telegram API URL: {}", telegram_api_url());
    tracing::info!("  - HTTP request timeout: {:?}", http_request_timeout());
    tracing::info!("  - Telegram long poll: {}s", telegram_long_poll_secs());
    tracing::info!("  - Notification channel capacity: {}", notification_channel_capacity());
    tracing::info!("===============================");
}
