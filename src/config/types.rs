//! Configuration types for the alert service
//!
//! This module defines all configuration structs that are loaded from YAML
//! once at startup. Nothing here is mutated at runtime.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, Result};

// ============================================================================
// Enums
// ============================================================================

/// What the bonding-curve track does once a subscription has graduated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GraduationPolicy {
    /// Stop bonding-curve polling; price polling continues
    #[default]
    StopBondingCurve,
    /// Keep polling both tracks
    Continue,
}

impl std::fmt::Display for GraduationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraduationPolicy::StopBondingCurve => write!(f, "stop_bonding_curve"),
            GraduationPolicy::Continue => write!(f, "continue"),
        }
    }
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Alert thresholds, each list strictly ascending
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Bonding-curve progress percentages (e.g., [50, 75, 90, 95, 99])
    pub bonding_curve: Vec<f64>,
    /// Market-cap USD values
    pub market_cap: Vec<f64>,
}

/// Poll scheduler timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    /// Bonding-curve (progress) track interval
    pub bonding_curve_interval_secs: u64,
    /// Price (market-cap) track interval
    pub price_interval_secs: u64,
    /// Upper bound on a single metrics fetch
    pub fetch_timeout_ms: u64,
    /// Subscriptions polled in parallel within one cycle
    pub max_concurrent_polls: usize,
    pub graduation_policy: GraduationPolicy,
}

impl PollingConfig {
    pub fn bonding_curve_interval(&self) -> Duration {
        Duration::from_secs(self.bonding_curve_interval_secs)
    }

    pub fn price_interval(&self) -> Duration {
        Duration::from_secs(self.price_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// pump.fun protocol constants, in whole token units
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProtocolConstants {
    /// Tokens held back from the curve
    pub reserved_tokens: u64,
    /// Tokens sold through the curve from launch to graduation
    pub initial_real_reserves: u64,
    pub total_supply: u64,
}

/// One-shot discovery queries (/trending, /graduating)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Progress percentage at which a token counts as about to graduate
    pub graduating_cutoff: f64,
    /// Lower USD price bound for trending trades
    pub trending_min_price: f64,
    /// Upper USD price bound for trending trades
    pub trending_max_price: f64,
    /// Rows shown per listing
    pub result_limit: usize,
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub thresholds: ThresholdConfig,
    pub polling: PollingConfig,
    pub protocol: ProtocolConstants,
    pub discovery: DiscoveryConfig,
}

fn validate_ascending(name: &str, values: &[f64]) -> Result<()> {
    if values.is_empty() {
        return Err(AppError::Config(format!(
            "thresholds.{} must contain at least one value",
            name
        )));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
        return Err(AppError::Config(format!(
            "thresholds.{}: values must be finite and >= 0 (got {})",
            name, bad
        )));
    }
    if let Some(pair) = values.windows(2).find(|w| w[0] >= w[1]) {
        return Err(AppError::Config(format!(
            "thresholds.{} must be strictly ascending ({} >= {})",
            name, pair[0], pair[1]
        )));
    }
    Ok(())
}

impl AppConfig {
    /// Validate all configuration rules
    pub fn validate(&self) -> Result<()> {
        validate_ascending("bonding_curve", &self.thresholds.bonding_curve)?;
        validate_ascending("market_cap", &self.thresholds.market_cap)?;

        // Rule: both tracks need a non-zero period
        if self.polling.bonding_curve_interval_secs == 0 || self.polling.price_interval_secs == 0 {
            return Err(AppError::Config(
                "Polling intervals must be > 0 seconds".to_string()
            ));
        }

        if self.polling.fetch_timeout_ms == 0 {
            return Err(AppError::Config(
                "polling.fetch_timeout_ms must be > 0".to_string()
            ));
        }

        if self.polling.max_concurrent_polls == 0 {
            return Err(AppError::Config(
                "polling.max_concurrent_polls must be >= 1".to_string()
            ));
        }

        // Rule: progress formula divides by initial_real_reserves
        if self.protocol.initial_real_reserves == 0 || self.protocol.total_supply == 0 {
            return Err(AppError::Config(format!(
                "Protocol constants must be > 0 (initial_real_reserves={}, total_supply={})",
                self.protocol.initial_real_reserves, self.protocol.total_supply
            )));
        }

        if !(self.discovery.graduating_cutoff > 0.0 && self.discovery.graduating_cutoff <= 100.0) {
            return Err(AppError::Config(format!(
                "discovery.graduating_cutoff must be in (0, 100] (got {})",
                self.discovery.graduating_cutoff
            )));
        }

        if self.discovery.trending_min_price < 0.0
            || self.discovery.trending_min_price >= self.discovery.trending_max_price
        {
            return Err(AppError::Config(format!(
                "discovery: trending_min_price ({}) must be >= 0 and < trending_max_price ({})",
                self.discovery.trending_min_price, self.discovery.trending_max_price
            )));
        }

        if self.discovery.result_limit == 0 {
            return Err(AppError::Config(
                "discovery.result_limit must be >= 1".to_string()
            ));
        }

        Ok(())
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            bonding_curve: vec![50.0, 75.0, 90.0, 95.0, 99.0],
            market_cap: vec![10_000.0, 50_000.0, 100_000.0, 500_000.0, 1_000_000.0],
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            bonding_curve_interval_secs: 30,
            price_interval_secs: 10,
            fetch_timeout_ms: 10_000,
            max_concurrent_polls: 4,
            graduation_policy: GraduationPolicy::default(),
        }
    }
}

impl Default for ProtocolConstants {
    fn default() -> Self {
        Self {
            reserved_tokens: 206_900_000,
            initial_real_reserves: 793_100_000,
            total_supply: 1_000_000_000,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            graduating_cutoff: 95.0,
            trending_min_price: 0.00001,
            trending_max_price: 0.001,
            result_limit: 10,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
