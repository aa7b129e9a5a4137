//! Metrics sources for token pool and price data
//!
//! This module provides the `MetricsSource` abstraction the poll scheduler
//! and command service query, plus the Bitquery-backed implementation.

pub mod bitquery;
pub mod errors;
pub mod traits;
pub mod types;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types for convenience
pub use bitquery::{BitqueryClient, BitqueryConfig};
pub use errors::{SourceError, SourceResult};
pub use traits::MetricsSource;
pub use types::{PoolListing, TokenMetrics, TradeListing};
