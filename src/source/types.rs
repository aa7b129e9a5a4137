//! Value types produced by a metrics source

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw per-token observation from one poll.
///
/// `balance` and `price_usd` are independently optional: `None` means the
/// value was unavailable this cycle, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetrics {
    pub token_address: String,
    /// Token units left in the bonding-curve pool
    pub balance: Option<u64>,
    pub price_usd: Option<f64>,
    /// Price in the quote currency (SOL)
    pub price_quote: Option<f64>,
    /// Quote-side (SOL) liquidity held by the pool
    pub quote_liquidity: Option<f64>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl TokenMetrics {
    /// Empty observation for `token_address` stamped with the current time
    pub fn empty(token_address: &str) -> Self {
        Self {
            token_address: token_address.to_string(),
            balance: None,
            price_usd: None,
            price_quote: None,
            quote_liquidity: None,
            name: None,
            symbol: None,
            observed_at: Utc::now(),
        }
    }

    pub fn with_balance(mut self, balance: u64) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_price(mut self, price_usd: f64) -> Self {
        self.price_usd = Some(price_usd);
        self
    }

    /// True when neither metric is present
    pub fn is_empty(&self) -> bool {
        self.balance.is_none() && self.price_usd.is_none()
    }

    /// Combine a pool-side and a trade-side observation of the same token.
    ///
    /// Fields present in `self` win; gaps are filled from `other`.
    pub fn merge(mut self, other: TokenMetrics) -> Self {
        self.balance = self.balance.or(other.balance);
        self.price_usd = self.price_usd.or(other.price_usd);
        self.price_quote = self.price_quote.or(other.price_quote);
        self.quote_liquidity = self.quote_liquidity.or(other.quote_liquidity);
        self.name = self.name.or(other.name);
        self.symbol = self.symbol.or(other.symbol);
        self.observed_at = self.observed_at.max(other.observed_at);
        self
    }
}

/// A bonding-curve pool returned by the graduating query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolListing {
    pub token_address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub balance: u64,
    /// Quote-side (SOL) liquidity held by the pool
    pub quote_liquidity: Option<f64>,
}

/// A recent trade returned by the trending query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeListing {
    pub token_address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub price_usd: f64,
}
