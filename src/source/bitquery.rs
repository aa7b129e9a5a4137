//! Bitquery GraphQL metrics source
//!
//! Queries the Bitquery Solana API for pump.fun bonding-curve pools and
//! trades. Pool rows supply the remaining token balance (progress input),
//! trade rows supply the latest USD price (market-cap input).

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ProtocolConstants;
use crate::core::logging::sanitize;
use crate::source::errors::{SourceError, SourceResult};
use crate::source::traits::MetricsSource;
use crate::source::types::{PoolListing, TokenMetrics, TradeListing};

/// pump.fun program address on Solana mainnet
pub const PUMP_FUN_PROGRAM_ADDRESS: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";

/// Quote mint used by pump.fun pools (native SOL)
pub const NATIVE_SOL_MINT: &str = "11111111111111111111111111111111";

const POOL_QUERY: &str = r#"
query PoolState($token: String!, $program: String!) {
  Solana {
    DEXPools(
      where: {
        Pool: {
          Market: { BaseCurrency: { MintAddress: { is: $token } } }
          Dex: { ProgramAddress: { is: $program } }
        }
      }
      orderBy: { descending: Block_Slot }
      limit: { count: 1 }
    ) {
      Pool {
        Market {
          MarketAddress
          BaseCurrency { MintAddress Symbol Name }
        }
        Quote { PostAmount PriceInUSD }
        Base { PostAmount }
      }
    }
  }
}
"#;

const PRICE_QUERY: &str = r#"
query LatestPrice($token: String!, $program: String!) {
  Solana {
    DEXTradeByTokens(
      where: {
        Trade: {
          Currency: { MintAddress: { is: $token } }
          Dex: { ProgramAddress: { is: $program } }
        }
        Transaction: { Result: { Success: true } }
      }
      orderBy: { descending: Block_Time }
      limit: { count: 1 }
    ) {
      Trade {
        Currency { MintAddress Symbol Name }
        Price
        PriceInUSD
      }
    }
  }
}
"#;

const GRADUATING_QUERY: &str = r#"
query Graduating($minBalance: String!, $maxBalance: String!, $program: String!, $quote: String!, $limit: Int!) {
  Solana {
    DEXPools(
      where: {
        Pool: {
          Base: { PostAmount: { gt: $minBalance, lt: $maxBalance } }
          Dex: { ProgramAddress: { is: $program } }
          Market: { QuoteCurrency: { MintAddress: { is: $quote } } }
        }
        Transaction: { Result: { Success: true } }
      }
      orderBy: { descending: Block_Slot }
      limit: { count: $limit }
    ) {
      Pool {
        Market {
          MarketAddress
          BaseCurrency { MintAddress Symbol Name }
        }
        Quote { PostAmount PriceInUSD }
        Base { PostAmount }
      }
    }
  }
}
"#;

const TRENDING_QUERY: &str = r#"
query Trending($minPrice: Float!, $maxPrice: Float!, $program: String!, $quote: String!, $limit: Int!) {
  Solana {
    DEXTradeByTokens(
      where: {
        Trade: {
          PriceInUSD: { gt: $minPrice, lt: $maxPrice }
          Dex: { ProgramAddress: { is: $program } }
          Side: { Currency: { MintAddress: { is: $quote } } }
        }
        Transaction: { Result: { Success: true } }
      }
      orderBy: { descending: Block_Time }
      limit: { count: $limit }
    ) {
      Trade {
        Currency { MintAddress Symbol Name }
        Price
        PriceInUSD
      }
    }
  }
}
"#;

/// Rows requested by discovery queries before local filtering
const DISCOVERY_FETCH_LIMIT: u32 = 100;

/// Connection settings for the Bitquery API
#[derive(Debug, Clone)]
pub struct BitqueryConfig {
    /// GraphQL endpoint (e.g., <https://streaming.bitquery.io/eap>)
    pub url: String,
    /// Bearer token
    pub api_key: String,
    /// Launch venue program filtering pools and trades
    pub program_address: String,
    /// Quote currency mint for discovery queries
    pub quote_mint: String,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl BitqueryConfig {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            program_address: PUMP_FUN_PROGRAM_ADDRESS.to_string(),
            quote_mint: NATIVE_SOL_MINT.to_string(),
            request_timeout,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SolanaEnvelope<T> {
    #[serde(rename = "Solana")]
    solana: T,
}

#[derive(Debug, Deserialize)]
struct PoolRows {
    #[serde(rename = "DEXPools", default)]
    pools: Vec<PoolRow>,
}

#[derive(Debug, Deserialize)]
struct TradeRows {
    #[serde(rename = "DEXTradeByTokens", default)]
    trades: Vec<TradeRow>,
}

#[derive(Debug, Deserialize)]
struct PoolRow {
    #[serde(rename = "Pool")]
    pool: Pool,
}

#[derive(Debug, Deserialize)]
struct Pool {
    #[serde(rename = "Market")]
    market: Market,
    #[serde(rename = "Quote", default)]
    quote: Option<PoolSide>,
    #[serde(rename = "Base", default)]
    base: Option<PoolSide>,
}

#[derive(Debug, Deserialize)]
struct Market {
    #[serde(rename = "BaseCurrency")]
    base_currency: Currency,
}

#[derive(Debug, Deserialize)]
struct PoolSide {
    #[serde(rename = "PostAmount", default)]
    post_amount: Option<RawNumber>,
}

#[derive(Debug, Deserialize)]
struct Currency {
    #[serde(rename = "MintAddress")]
    mint_address: String,
    #[serde(rename = "Symbol", default)]
    symbol: Option<String>,
    #[serde(rename = "Name", default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TradeRow {
    #[serde(rename = "Trade")]
    trade: Trade,
}

#[derive(Debug, Deserialize)]
struct Trade {
    #[serde(rename = "Currency")]
    currency: Currency,
    #[serde(rename = "Price", default)]
    price: Option<RawNumber>,
    #[serde(rename = "PriceInUSD", default)]
    price_in_usd: Option<RawNumber>,
}

/// Bitquery returns amounts as strings and prices as numbers
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Text(String),
    Number(serde_json::Number),
}

impl RawNumber {
    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            RawNumber::Text(s) => {
                let s = s.trim();
                Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)).ok()
            }
            RawNumber::Number(n) => n.as_f64().and_then(Decimal::from_f64),
        }
    }

    fn to_f64(&self) -> Option<f64> {
        match self {
            RawNumber::Text(s) => s.trim().parse::<f64>().ok(),
            RawNumber::Number(n) => n.as_f64(),
        }
    }

    /// Whole token units, truncating any fractional part
    fn to_units(&self) -> Option<u64> {
        self.to_decimal()
            .filter(|d| !d.is_sign_negative())
            .and_then(|d| d.trunc().to_u64())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

// ============================================================================
// Client
// ============================================================================

/// Bitquery-backed `MetricsSource`
pub struct BitqueryClient {
    http: reqwest::Client,
    config: BitqueryConfig,
    protocol: ProtocolConstants,
}

impl BitqueryClient {
    pub fn new(config: BitqueryConfig, protocol: ProtocolConstants) -> SourceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SourceError::Unreachable(format!("Failed to build HTTP client: {}", e)))?;

        debug!(
            url = %config.url,
            api_key = %sanitize(&config.api_key),
            "Bitquery client configured"
        );

        Ok(Self {
            http,
            config,
            protocol,
        })
    }

    async fn execute<T: DeserializeOwned>(&self, query: &str, variables: Value) -> SourceResult<T> {
        let response = self
            .http
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "<no body>".to_string());
            return Err(SourceError::Unreachable(format!(
                "Query failed with status {}: {}",
                status, body
            )));
        }

        let envelope: GraphQlResponse<SolanaEnvelope<T>> = response.json().await?;
        if !envelope.errors.is_empty() {
            let messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
            return Err(SourceError::InvalidResponse(messages.join("; ")));
        }

        envelope
            .data
            .map(|d| d.solana)
            .ok_or_else(|| SourceError::InvalidResponse("Response carried no data".to_string()))
    }

    fn balance_ceiling(&self, min_progress: f64) -> u64 {
        let reserved = self.protocol.reserved_tokens as f64;
        let initial = self.protocol.initial_real_reserves as f64;
        (reserved + initial * (100.0 - min_progress) / 100.0).max(0.0) as u64
    }
}

#[async_trait]
impl MetricsSource for BitqueryClient {
    async fn fetch_metrics(&self, token_address: &str) -> SourceResult<TokenMetrics> {
        let (pool, trade) = tokio::join!(
            self.fetch_bonding_curve(token_address),
            self.fetch_price(token_address)
        );

        let metrics = match (pool, trade) {
            (Ok(pool), Ok(trade)) => pool.merge(trade),
            (Ok(pool), Err(e)) => {
                warn!(
                    token = %token_address,
                    error = %e,
                    "Price query failed, continuing with pool data"
                );
                pool
            }
            (Err(e), Ok(trade)) => {
                warn!(
                    token = %token_address,
                    error = %e,
                    "Pool query failed, continuing with trade data"
                );
                trade
            }
            (Err(e), Err(_)) => return Err(e),
        };

        if metrics.is_empty() {
            return Err(SourceError::NotFound(token_address.to_string()));
        }
        Ok(metrics)
    }

    async fn fetch_bonding_curve(&self, token_address: &str) -> SourceResult<TokenMetrics> {
        let rows: PoolRows = self
            .execute(
                POOL_QUERY,
                json!({ "token": token_address, "program": self.config.program_address }),
            )
            .await?;

        let mut metrics = TokenMetrics::empty(token_address);
        if let Some(row) = rows.pools.into_iter().next() {
            let pool = row.pool;
            metrics.balance = pool.base.and_then(|b| b.post_amount).and_then(|n| n.to_units());
            metrics.quote_liquidity = pool
                .quote
                .and_then(|q| q.post_amount)
                .and_then(|n| n.to_f64());
            metrics.name = non_empty(pool.market.base_currency.name);
            metrics.symbol = non_empty(pool.market.base_currency.symbol);
        }
        debug!(token = %token_address, balance = ?metrics.balance, "Pool state fetched");
        Ok(metrics)
    }

    async fn fetch_price(&self, token_address: &str) -> SourceResult<TokenMetrics> {
        let rows: TradeRows = self
            .execute(
                PRICE_QUERY,
                json!({ "token": token_address, "program": self.config.program_address }),
            )
            .await?;

        let mut metrics = TokenMetrics::empty(token_address);
        if let Some(row) = rows.trades.into_iter().next() {
            let trade = row.trade;
            metrics.price_usd = trade.price_in_usd.and_then(|n| n.to_f64()).filter(|p| *p >= 0.0);
            metrics.price_quote = trade.price.and_then(|n| n.to_f64());
            metrics.name = non_empty(trade.currency.name);
            metrics.symbol = non_empty(trade.currency.symbol);
        }
        debug!(token = %token_address, price_usd = ?metrics.price_usd, "Latest price fetched");
        Ok(metrics)
    }

    async fn fetch_graduating(&self, min_progress: f64) -> SourceResult<Vec<PoolListing>> {
        let rows: PoolRows = self
            .execute(
                GRADUATING_QUERY,
                json!({
                    "minBalance": self.protocol.reserved_tokens.to_string(),
                    "maxBalance": self.balance_ceiling(min_progress).to_string(),
                    "program": self.config.program_address,
                    "quote": self.config.quote_mint,
                    "limit": DISCOVERY_FETCH_LIMIT,
                }),
            )
            .await?;

        Ok(rows
            .pools
            .into_iter()
            .filter_map(|row| {
                let pool = row.pool;
                let balance = pool.base.and_then(|b| b.post_amount).and_then(|n| n.to_units())?;
                Some(PoolListing {
                    token_address: pool.market.base_currency.mint_address,
                    name: non_empty(pool.market.base_currency.name),
                    symbol: non_empty(pool.market.base_currency.symbol),
                    balance,
                    quote_liquidity: pool
                        .quote
                        .and_then(|q| q.post_amount)
                        .and_then(|n| n.to_f64()),
                })
            })
            .collect())
    }

    async fn fetch_trending(
        &self,
        min_price: f64,
        max_price: f64,
    ) -> SourceResult<Vec<TradeListing>> {
        let rows: TradeRows = self
            .execute(
                TRENDING_QUERY,
                json!({
                    "minPrice": min_price,
                    "maxPrice": max_price,
                    "program": self.config.program_address,
                    "quote": self.config.quote_mint,
                    "limit": DISCOVERY_FETCH_LIMIT,
                }),
            )
            .await?;

        Ok(rows
            .trades
            .into_iter()
            .filter_map(|row| {
                let trade = row.trade;
                let price_usd = trade.price_in_usd.and_then(|n| n.to_f64())?;
                Some(TradeListing {
                    token_address: trade.currency.mint_address,
                    name: non_empty(trade.currency.name),
                    symbol: non_empty(trade.currency.symbol),
                    price_usd,
                })
            })
            .collect())
    }

    fn source_name(&self) -> &'static str {
        "bitquery"
    }
}
