//! Bonding-curve progress and market-cap derivation
//!
//! Pure functions over `TokenMetrics`. A missing input propagates as a
//! missing output; progress is deliberately not clamped to [0, 100] so that
//! anomalous upstream balances stay visible to alerting.

use serde::{Deserialize, Serialize};

use crate::config::ProtocolConstants;
use crate::source::TokenMetrics;

/// Values computed from one observation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedValues {
    /// Bonding-curve progress in percent; may fall outside [0, 100]
    pub progress: Option<f64>,
    /// USD market cap (price × total supply)
    pub market_cap: Option<f64>,
}

/// `100 - ((balance - reserved) * 100) / initial_real_reserves`
pub fn bonding_curve_progress(balance: u64, protocol: &ProtocolConstants) -> f64 {
    let unsold = balance as f64 - protocol.reserved_tokens as f64;
    100.0 - (unsold * 100.0) / protocol.initial_real_reserves as f64
}

pub fn market_cap(price_usd: f64, protocol: &ProtocolConstants) -> f64 {
    price_usd * protocol.total_supply as f64
}

/// Derive both values, each only when its input is present
pub fn derive(metrics: &TokenMetrics, protocol: &ProtocolConstants) -> DerivedValues {
    DerivedValues {
        progress: metrics.balance.map(|b| bonding_curve_progress(b, protocol)),
        market_cap: metrics.price_usd.map(|p| market_cap(p, protocol)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol() -> ProtocolConstants {
        ProtocolConstants::default()
    }

    #[test]
    fn test_progress_at_reserved_balance_is_graduation() {
        assert_eq!(bonding_curve_progress(206_900_000, &protocol()), 100.0);
    }

    #[test]
    fn test_progress_mid_curve() {
        let progress = bonding_curve_progress(500_000_000, &protocol());
        assert!((progress - 63.0437).abs() < 0.001, "Got: {}", progress);
    }

    #[test]
    fn test_progress_at_launch_is_zero() {
        let progress = bonding_curve_progress(1_000_000_000, &protocol());
        assert!(progress.abs() < 1e-9, "Got: {}", progress);
    }

    #[test]
    fn test_progress_not_clamped() {
        // Balance below the reserve => above 100
        assert!(bonding_curve_progress(100_000_000, &protocol()) > 100.0);
        // Balance above total supply => below 0
        assert!(bonding_curve_progress(1_100_000_000, &protocol()) < 0.0);
    }

    #[test]
    fn test_market_cap() {
        let cap = market_cap(0.0001, &protocol());
        assert!((cap - 100_000.0).abs() < 1e-6, "Got: {}", cap);
    }

    #[test]
    fn test_derive_propagates_missing_values() {
        let only_price = TokenMetrics::empty("mint").with_price(0.0001);
        let derived = derive(&only_price, &protocol());
        assert!(derived.progress.is_none());
        assert!(derived.market_cap.is_some());

        let only_balance = TokenMetrics::empty("mint").with_balance(500_000_000);
        let derived = derive(&only_balance, &protocol());
        assert!(derived.progress.is_some());
        assert!(derived.market_cap.is_none());
    }

    #[test]
    fn test_zero_price_is_zero_market_cap() {
        let derived = derive(&TokenMetrics::empty("mint").with_price(0.0), &protocol());
        assert_eq!(derived.market_cap, Some(0.0));
    }
}
