//! Centralized logging configuration for bonding_alert
//!
//! Structured logging on top of `tracing`:
//! - JSON output by default (parseable by log aggregation tools)
//! - Pretty-print output for development (`LOG_FORMAT=pretty`)
//! - Level filter from `RUST_LOG`
//! - Redaction helpers for credentials
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG` | `bonding_alert=info` | Log level filter (standard tracing format) |
//! | `LOG_FORMAT` | `json` | Output format: `json` or `pretty` |
//!
//! ```rust,ignore
//! use bonding_alert::core::logging::{init_logging, sanitize};
//!
//! init_logging();
//! tracing::info!(api_key = %sanitize(&key), "Connecting to data source");
//! ```

use std::env;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::{fmt as ts_fmt, fmt::format::FmtSpan, prelude::*, EnvFilter};

static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Default log level when RUST_LOG is not set
pub const DEFAULT_LOG_LEVEL: &str = "bonding_alert=info";

/// Field names whose values must go through `SanitizedValue` before logging
pub const SENSITIVE_FIELD_PATTERNS: &[&str] = &["api_key", "bot_token", "secret", "auth"];

/// Wrapper for sensitive data that should be redacted in logs.
///
/// Values longer than 8 characters keep their first 4 characters followed by
/// "...REDACTED"; anything shorter is fully redacted.
#[derive(Clone)]
pub struct SanitizedValue<'a>(&'a str);

impl<'a> SanitizedValue<'a> {
    pub fn new(value: &'a str) -> Self {
        Self(value)
    }

    /// The raw value. Never pass this to a log macro.
    pub fn expose(&self) -> &str {
        self.0
    }
}

impl fmt::Display for SanitizedValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `get` keeps multi-byte prefixes from panicking
        match self.0.get(..4) {
            Some(prefix) if self.0.len() > 8 => write!(f, "{}...REDACTED", prefix),
            _ => write!(f, "REDACTED"),
        }
    }
}

impl fmt::Debug for SanitizedValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SanitizedValue(***)")
    }
}

/// Shorthand for `SanitizedValue::new(value)`
pub fn sanitize(value: &str) -> SanitizedValue<'_> {
    SanitizedValue::new(value)
}

/// Shorten a token address for log lines: `2Z4F…pump`
pub fn short_address(address: &str) -> String {
    match (address.get(..4), address.get(address.len().saturating_sub(4)..)) {
        (Some(head), Some(tail)) if address.len() > 12 => format!("{}…{}", head, tail),
        _ => address.to_string(),
    }
}

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter string (e.g., "bonding_alert=debug,bonding_alert::source=trace")
    pub level_filter: String,
    pub use_pretty_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level_filter: DEFAULT_LOG_LEVEL.to_string(),
            use_pretty_format: false,
        }
    }
}

impl LoggingConfig {
    /// Read `RUST_LOG` and `LOG_FORMAT`
    pub fn from_env() -> Self {
        let level_filter = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
        let use_pretty_format = env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("pretty"))
            .unwrap_or(false);

        Self {
            level_filter,
            use_pretty_format,
        }
    }
}

/// Initialize logging from the environment. Subsequent calls are no-ops.
pub fn init_logging() {
    init_logging_with_config(LoggingConfig::from_env());
}

pub fn init_logging_with_config(config: LoggingConfig) {
    if LOGGING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    let env_filter = EnvFilter::try_new(&config.level_filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    if config.use_pretty_format {
        tracing_subscriber::registry()
            .with(
                ts_fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                ts_fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true)
                    .with_current_span(true),
            )
            .with(env_filter)
            .init();
    }
}

/// Test subscriber writing through the test harness; double init is ignored
#[cfg(test)]
pub fn init_test_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_sanitized_value_long_string() {
        let sanitized = SanitizedValue::new("ory_at_1234567890abcdef");
        assert_eq!(format!("{}", sanitized), "ory_...REDACTED");
    }

    #[test]
    fn test_sanitized_value_short_string() {
        assert_eq!(format!("{}", SanitizedValue::new("abc")), "REDACTED");
    }

    #[test]
    fn test_sanitized_value_empty_string() {
        assert_eq!(format!("{}", SanitizedValue::new("")), "REDACTED");
    }

    #[test]
    fn test_sanitized_value_boundary() {
        // 8 chars is not > 8
        assert_eq!(format!("{}", SanitizedValue::new("12345678")), "REDACTED");
        assert_eq!(format!("{}", SanitizedValue::new("123456789")), "1234...REDACTED");
    }

    #[test]
    fn test_sanitized_value_multibyte_prefix() {
        // '€' is 3 bytes, so byte 4 falls inside the second char
        let value = "€€abcdefgh";
        assert_eq!(format!("{}", SanitizedValue::new(value)), "REDACTED");
    }

    #[test]
    fn test_sanitized_value_debug() {
        let sanitized = SanitizedValue::new("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11");
        assert_eq!(format!("{:?}", sanitized), "SanitizedValue(***)");
    }

    #[test]
    fn test_expose_returns_original_value() {
        assert_eq!(sanitize("my-super-secret").expose(), "my-super-secret");
    }

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("2Z4FzKBcw48KBD2PaR4wtxo4sYGbS7QqTQCLoQnUpump"),
            "2Z4F…pump"
        );
        assert_eq!(short_address("short"), "short");
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level_filter, DEFAULT_LOG_LEVEL);
        assert!(!config.use_pretty_format);
    }

    #[test]
    #[serial(env)]
    fn test_logging_config_from_env() {
        std::env::set_var("RUST_LOG", "bonding_alert=debug");
        std::env::set_var("LOG_FORMAT", "Pretty");

        let config = LoggingConfig::from_env();
        assert_eq!(config.level_filter, "bonding_alert=debug");
        assert!(config.use_pretty_format);

        std::env::remove_var("RUST_LOG");
        std::env::remove_var("LOG_FORMAT");

        let config = LoggingConfig::from_env();
        assert_eq!(config.level_filter, DEFAULT_LOG_LEVEL);
        assert!(!config.use_pretty_format);
    }

    #[test]
    fn test_sensitive_field_patterns_contains_expected() {
        assert!(SENSITIVE_FIELD_PATTERNS.contains(&"api_key"));
        assert!(SENSITIVE_FIELD_PATTERNS.contains(&"bot_token"));
    }
}
