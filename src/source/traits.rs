//! Metrics source trait definition
//!
//! The MetricsSource trait is the only suspension point of a poll: every
//! call is network I/O and is wrapped in a timeout by the caller.

use async_trait::async_trait;

use crate::source::errors::SourceResult;
use crate::source::types::{PoolListing, TokenMetrics, TradeListing};

/// Common trait for on-chain data providers
///
/// # Example Implementation
///
/// ```ignore
/// use async_trait::async_trait;
///
/// struct StaticSource;
///
/// #[async_trait]
/// impl MetricsSource for StaticSource {
///     async fn fetch_metrics(&self, token: &str) -> SourceResult<TokenMetrics> {
///         Ok(TokenMetrics::empty(token).with_balance(500_000_000))
///     }
///     // ... discovery queries
/// }
/// ```
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Fetch both the pool balance and the latest price for a token.
    ///
    /// A missing side is reported as `None` in the returned metrics; an
    /// error means nothing usable was obtained.
    async fn fetch_metrics(&self, token_address: &str) -> SourceResult<TokenMetrics>;

    /// Fetch only what the bonding-curve track needs (pool balance)
    async fn fetch_bonding_curve(&self, token_address: &str) -> SourceResult<TokenMetrics> {
        self.fetch_metrics(token_address).await
    }

    /// Fetch only what the price track needs (USD price)
    async fn fetch_price(&self, token_address: &str) -> SourceResult<TokenMetrics> {
        self.fetch_metrics(token_address).await
    }

    /// Pools whose progress is at or above `min_progress` percent
    async fn fetch_graduating(&self, min_progress: f64) -> SourceResult<Vec<PoolListing>>;

    /// Recent trades priced strictly between `min_price` and `max_price` USD
    async fn fetch_trending(
        &self,
        min_price: f64,
        max_price: f64,
    ) -> SourceResult<Vec<TradeListing>>;

    /// Provider identifier used in logs
    fn source_name(&self) -> &'static str;
}
