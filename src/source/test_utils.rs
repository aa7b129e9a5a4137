//! Shared test utilities for metrics source testing
//!
//! Provides a scriptable `MockMetricsSource` used by the registry, scheduler
//! and command service test modules.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::source::errors::{SourceError, SourceResult};
use crate::source::traits::MetricsSource;
use crate::source::types::{PoolListing, TokenMetrics, TradeListing};

/// One scripted answer; `Err` becomes `SourceError::Unreachable`
pub type ScriptedResponse = Result<TokenMetrics, String>;

/// Mock source answering from per-token response queues.
///
/// When a token's queue holds a single entry it is repeated forever, so a
/// test can script a sequence and let the last value stick.
#[derive(Default)]
pub struct MockMetricsSource {
    responses: Mutex<HashMap<String, VecDeque<ScriptedResponse>>>,
    /// Artificial latency applied to every fetch
    pub delay: Option<Duration>,
    /// Number of fetch calls served (all tokens)
    pub fetch_count: Arc<AtomicUsize>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    pub graduating: Vec<PoolListing>,
    pub trending: Vec<TradeListing>,
}

impl MockMetricsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that sleeps `delay` before answering
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Append a response to the queue for `token`
    pub fn push(&self, token: &str, response: ScriptedResponse) {
        self.responses
            .lock()
            .unwrap()
            .entry(token.to_string())
            .or_default()
            .push_back(response);
    }

    /// Script an observation with the given balance and price
    pub fn push_values(&self, token: &str, balance: Option<u64>, price_usd: Option<f64>) {
        let mut metrics = TokenMetrics::empty(token);
        metrics.balance = balance;
        metrics.price_usd = price_usd;
        self.push(token, Ok(metrics));
    }

    pub fn fetches(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Highest number of fetches observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, token: &str) -> SourceResult<TokenMetrics> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses
            .get_mut(token)
            .ok_or_else(|| SourceError::NotFound(token.to_string()))?;
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match next {
            Some(Ok(metrics)) => Ok(metrics),
            Some(Err(reason)) => Err(SourceError::Unreachable(reason)),
            None => Err(SourceError::NotFound(token.to_string())),
        }
    }
}

#[async_trait]
impl MetricsSource for MockMetricsSource {
    async fn fetch_metrics(&self, token_address: &str) -> SourceResult<TokenMetrics> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.next_response(token_address)
    }

    async fn fetch_graduating(&self, _min_progress: f64) -> SourceResult<Vec<PoolListing>> {
        Ok(self.graduating.clone())
    }

    async fn fetch_trending(
        &self,
        _min_price: f64,
        _max_price: f64,
    ) -> SourceResult<Vec<TradeListing>> {
        Ok(self.trending.clone())
    }

    fn source_name(&self) -> &'static str {
        "mock"
    }
}
