//! Command service
//!
//! Entry point for the chat layer. Each user command maps onto a registry
//! operation or a one-shot query against the metrics source. Nothing here
//! touches the alerted-threshold bookkeeping of a subscription.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use crate::config::{AppConfig, DiscoveryConfig, ProtocolConstants};
use crate::core::derive::{bonding_curve_progress, derive, market_cap};
use crate::core::evaluator::GRADUATION_THRESHOLD;
use crate::core::events::{log_event, AlertEvent};
use crate::core::registry::{SharedRegistry, UserId};
use crate::source::{MetricsSource, SourceError, SourceResult};

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const MIN_ADDRESS_LEN: usize = 32;
const MAX_ADDRESS_LEN: usize = 44;

/// Errors surfaced synchronously to the chat layer
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid token address: {0}")]
    InvalidTokenAddress(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Not monitoring {0}")]
    NotSubscribed(String),
}

pub type CommandResult<T> = Result<T, CommandError>;

/// Trim and check a Solana mint address (32-44 base58 characters)
pub fn validate_token_address(raw: &str) -> CommandResult<String> {
    let address = raw.trim();
    let len = address.chars().count();
    if !(MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&len) {
        return Err(CommandError::InvalidTokenAddress(format!(
            "expected {}-{} characters, got {}",
            MIN_ADDRESS_LEN, MAX_ADDRESS_LEN, len
        )));
    }
    if let Some(bad) = address.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
        return Err(CommandError::InvalidTokenAddress(format!(
            "'{}' is not a base58 character",
            bad
        )));
    }
    Ok(address.to_string())
}

/// Result of a monitor command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitored {
    pub token_address: String,
    /// False when the user was already monitoring this token
    pub created: bool,
}

/// On-demand snapshot of one token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenStatus {
    pub token_address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub price_usd: Option<f64>,
    /// Price in SOL
    pub price_quote: Option<f64>,
    /// Token units left in the pool
    pub balance: Option<u64>,
    pub progress: Option<f64>,
    pub market_cap: Option<f64>,
    /// SOL held by the pool
    pub quote_liquidity: Option<f64>,
    pub observed_at: DateTime<Utc>,
    pub graduated: bool,
    /// Progress at or above the graduating cutoff but not yet graduated
    pub about_to_graduate: bool,
}

/// One row of a user's monitoring list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionSummary {
    pub token_address: String,
    pub created_at: DateTime<Utc>,
    /// Last polled values; `None` until the first successful poll
    pub progress: Option<f64>,
    pub market_cap: Option<f64>,
    pub graduated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingToken {
    pub token_address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub price_usd: f64,
    pub market_cap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraduatingToken {
    pub token_address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub progress: f64,
    pub quote_liquidity: Option<f64>,
}

/// Glue between the inbound command interface and the core
pub struct CommandService {
    source: Arc<dyn MetricsSource>,
    registry: SharedRegistry,
    protocol: ProtocolConstants,
    discovery: DiscoveryConfig,
    fetch_timeout: Duration,
}

impl CommandService {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        registry: SharedRegistry,
        config: &AppConfig,
    ) -> Self {
        Self {
            source,
            registry,
            protocol: config.protocol,
            discovery: config.discovery.clone(),
            fetch_timeout: config.polling.fetch_timeout(),
        }
    }

    /// Start monitoring; both polling tracks pick the subscription up on their next tick
    pub async fn monitor(&self, user_id: UserId, raw_address: &str) -> CommandResult<Monitored> {
        let token_address = validate_token_address(raw_address)?;
        let created = self.registry.add(user_id, &token_address).await;
        if created {
            log_event(&AlertEvent::subscription_added(user_id, &token_address));
        }
        Ok(Monitored {
            token_address,
            created,
        })
    }

    /// Stop monitoring; in-flight polls for the pair are discarded
    pub async fn unmonitor(&self, user_id: UserId, raw_address: &str) -> CommandResult<String> {
        let token_address = validate_token_address(raw_address)?;
        if !self.registry.remove(user_id, &token_address).await {
            return Err(CommandError::NotSubscribed(token_address));
        }
        log_event(&AlertEvent::subscription_removed(user_id, &token_address));
        Ok(token_address)
    }

    /// Single fetch and derivation, bypassing alert bookkeeping
    pub async fn status(&self, user_id: UserId, raw_address: &str) -> CommandResult<TokenStatus> {
        let token_address = validate_token_address(raw_address)?;
        debug!(user_id, token = %token_address, "Status requested");

        let metrics = self
            .bounded(self.source.fetch_metrics(&token_address))
            .await?;
        let derived = derive(&metrics, &self.protocol);
        let graduated = derived.progress.is_some_and(|p| p >= GRADUATION_THRESHOLD);
        let about_to_graduate = !graduated
            && derived
                .progress
                .is_some_and(|p| p >= self.discovery.graduating_cutoff);

        Ok(TokenStatus {
            token_address,
            name: metrics.name,
            symbol: metrics.symbol,
            price_usd: metrics.price_usd,
            price_quote: metrics.price_quote,
            balance: metrics.balance,
            progress: derived.progress,
            market_cap: derived.market_cap,
            quote_liquidity: metrics.quote_liquidity,
            observed_at: metrics.observed_at,
            graduated,
            about_to_graduate,
        })
    }

    /// The user's subscriptions in the order they were added
    pub async fn list(&self, user_id: UserId) -> Vec<SubscriptionSummary> {
        let mut rows = Vec::new();
        for token_address in self.registry.list_for_user(user_id).await {
            // Removed between the two reads
            let Some(entry) = self.registry.get(user_id, &token_address).await else {
                continue;
            };
            let state = entry.snapshot().await;
            let observed = state.last_observed.unwrap_or_default();
            rows.push(SubscriptionSummary {
                token_address,
                created_at: entry.created_at,
                progress: observed.progress,
                market_cap: observed.market_cap,
                graduated: state.graduated,
            });
        }
        rows
    }

    /// Recently traded tokens inside the configured price band, highest market cap first
    pub async fn trending(&self) -> CommandResult<Vec<TrendingToken>> {
        let trades = self
            .bounded(self.source.fetch_trending(
                self.discovery.trending_min_price,
                self.discovery.trending_max_price,
            ))
            .await?;

        // Rows arrive newest first; keep the latest trade per token
        let mut seen = HashSet::new();
        let mut tokens: Vec<TrendingToken> = trades
            .into_iter()
            .filter(|t| seen.insert(t.token_address.clone()))
            .map(|t| TrendingToken {
                market_cap: market_cap(t.price_usd, &self.protocol),
                token_address: t.token_address,
                name: t.name,
                symbol: t.symbol,
                price_usd: t.price_usd,
            })
            .collect();

        tokens.sort_by(|a, b| b.market_cap.total_cmp(&a.market_cap));
        tokens.truncate(self.discovery.result_limit);
        Ok(tokens)
    }

    /// Pools at or above the graduating cutoff, closest to graduation first
    pub async fn graduating(&self) -> CommandResult<Vec<GraduatingToken>> {
        let cutoff = self.discovery.graduating_cutoff;
        let pools = self.bounded(self.source.fetch_graduating(cutoff)).await?;

        let mut seen = HashSet::new();
        let mut tokens: Vec<GraduatingToken> = pools
            .into_iter()
            .filter(|p| seen.insert(p.token_address.clone()))
            .map(|p| GraduatingToken {
                progress: bonding_curve_progress(p.balance, &self.protocol),
                token_address: p.token_address,
                name: p.name,
                symbol: p.symbol,
                quote_liquidity: p.quote_liquidity,
            })
            .filter(|t| t.progress >= cutoff)
            .collect();

        tokens.sort_by(|a, b| b.progress.total_cmp(&a.progress));
        tokens.truncate(self.discovery.result_limit);
        Ok(tokens)
    }

    async fn bounded<T>(
        &self,
        fetch: impl std::future::Future<Output = SourceResult<T>>,
    ) -> CommandResult<T> {
        match timeout(self.fetch_timeout, fetch).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(SourceError::Timeout(self.fetch_timeout.as_millis() as u64).into()),
        }
    }
}
