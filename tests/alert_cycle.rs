//! End-to-end alert cycle
//!
//! Drives the public API the way the bot does:
//! 1. `/monitor` through the command service
//! 2. Bonding-curve and price cycles against a scripted source
//! 3. Notifications drained into a recording sink
//! 4. Graduation, then `/unmonitor`
//!
//! # Running the tests
//! ```bash
//! cargo test --test alert_cycle
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use bonding_alert::config::AppConfig;
use bonding_alert::core::{AlertKind, CommandService, PollScheduler, SubscriptionRegistry, Track};
use bonding_alert::notify::{delivery_task, DeliveryError, Notification, NotificationSink};
use bonding_alert::source::{
    MetricsSource, PoolListing, SourceError, SourceResult, TokenMetrics, TradeListing,
};

const TOKEN: &str = "2Z4FzKBcw48KBD2PaR4wtxo4sYGbS7QqTQCLoQnUpump";
const USER: i64 = 1001;

/// Pool balance at 60% progress
const BALANCE_60: u64 = 524_140_000;
/// Pool balance once the curve is complete
const BALANCE_DONE: u64 = 206_900_000;

// =============================================================================
// Test doubles
// =============================================================================

/// Source returning whatever was last set for a token
#[derive(Default)]
struct ScriptedSource {
    current: Mutex<HashMap<String, (Option<u64>, Option<f64>)>>,
}

impl ScriptedSource {
    fn set(&self, token: &str, balance: Option<u64>, price_usd: Option<f64>) {
        self.current
            .lock()
            .unwrap()
            .insert(token.to_string(), (balance, price_usd));
    }
}

#[async_trait]
impl MetricsSource for ScriptedSource {
    async fn fetch_metrics(&self, token_address: &str) -> SourceResult<TokenMetrics> {
        let (balance, price) = self
            .current
            .lock()
            .unwrap()
            .get(token_address)
            .copied()
            .ok_or_else(|| SourceError::NotFound(token_address.to_string()))?;

        let mut metrics = TokenMetrics::empty(token_address);
        metrics.balance = balance;
        metrics.price_usd = price;
        Ok(metrics)
    }

    async fn fetch_graduating(&self, _min_progress: f64) -> SourceResult<Vec<PoolListing>> {
        Ok(Vec::new())
    }

    async fn fetch_trending(&self, _min: f64, _max: f64) -> SourceResult<Vec<TradeListing>> {
        Ok(Vec::new())
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

#[derive(Default)]
struct CollectingSink {
    received: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationSink for CollectingSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.received.lock().unwrap().push(notification.clone());
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "collecting"
    }
}

// =============================================================================
// Flow
// =============================================================================

#[tokio::test]
async fn test_full_alert_cycle() {
    let config = AppConfig::default();
    let source = Arc::new(ScriptedSource::default());
    let registry = SubscriptionRegistry::new().into_shared();
    let (notification_tx, notification_rx) = mpsc::channel(64);
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let service = CommandService::new(source.clone(), registry.clone(), &config);
    let scheduler = PollScheduler::new(source.clone(), registry.clone(), &config, notification_tx);

    let sink = Arc::new(CollectingSink::default());
    let delivery = tokio::spawn(delivery_task(sink.clone(), notification_rx, shutdown_rx));

    // 1. Subscribe
    let monitored = service.monitor(USER, TOKEN).await.unwrap();
    assert!(monitored.created);
    assert!(!service.monitor(USER, TOKEN).await.unwrap().created);

    // 2. Unknown token: a data gap, not a failure
    let report = scheduler.run_cycle(Track::BondingCurve).await;
    assert_eq!((report.polled, report.failed, report.events), (1, 0, 0));

    // 3. 60% progress, $60k market cap
    source.set(TOKEN, Some(BALANCE_60), Some(0.00006));

    let report = scheduler.run_cycle(Track::BondingCurve).await;
    assert_eq!(report.events, 1, "only the 50% threshold is crossed");

    let report = scheduler.run_cycle(Track::Price).await;
    assert_eq!(report.events, 2, "10k and 50k market-cap thresholds");

    // 4. Same values again: nothing new
    assert_eq!(scheduler.run_cycle(Track::BondingCurve).await.events, 0);
    assert_eq!(scheduler.run_cycle(Track::Price).await.events, 0);

    // 5. Curve completes: remaining progress thresholds including graduation
    source.set(TOKEN, Some(BALANCE_DONE), Some(0.00006));
    let report = scheduler.run_cycle(Track::BondingCurve).await;
    assert_eq!(report.events, 5);

    // Graduated subscriptions leave the bonding-curve track
    let report = scheduler.run_cycle(Track::BondingCurve).await;
    assert_eq!((report.polled, report.skipped), (0, 1));
    assert_eq!(scheduler.run_cycle(Track::Price).await.polled, 1);

    let summaries = service.list(USER).await;
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].graduated);

    // 6. Unsubscribe
    service.unmonitor(USER, TOKEN).await.unwrap();
    assert!(service.unmonitor(USER, TOKEN).await.is_err());
    assert_eq!(scheduler.run_cycle(Track::Price).await, Default::default());

    // Dropping the scheduler closes the notification channel
    drop(scheduler);
    let delivered = delivery.await.unwrap();
    assert_eq!(delivered, 8);

    let received = sink.received.lock().unwrap();
    assert!(received.iter().all(|n| n.user_id == USER && n.token_address == TOKEN));

    let progress: Vec<f64> = received
        .iter()
        .filter(|n| n.kind == AlertKind::BondingCurve)
        .map(|n| n.threshold)
        .collect();
    assert_eq!(progress, vec![50.0, 75.0, 90.0, 95.0, 99.0, 100.0]);

    let caps: Vec<f64> = received
        .iter()
        .filter(|n| n.kind == AlertKind::MarketCap)
        .map(|n| n.threshold)
        .collect();
    assert_eq!(caps, vec![10_000.0, 50_000.0]);

    let graduation = received.iter().filter(|n| n.graduated).count();
    assert_eq!(graduation, 1);
}

#[tokio::test]
async fn test_subscribers_are_independent() {
    let config = AppConfig::default();
    let source = Arc::new(ScriptedSource::default());
    let registry = SubscriptionRegistry::new().into_shared();
    let (notification_tx, mut notification_rx) = mpsc::channel(64);

    let service = CommandService::new(source.clone(), registry.clone(), &config);
    let scheduler = PollScheduler::new(source.clone(), registry.clone(), &config, notification_tx);

    source.set(TOKEN, Some(BALANCE_60), None);
    service.monitor(1, TOKEN).await.unwrap();
    assert_eq!(scheduler.run_cycle(Track::BondingCurve).await.events, 1);

    // A late subscriber still gets its own first alert
    service.monitor(2, TOKEN).await.unwrap();
    let report = scheduler.run_cycle(Track::BondingCurve).await;
    assert_eq!((report.polled, report.events), (2, 1));

    drop(scheduler);
    let mut users = Vec::new();
    while let Some(n) = notification_rx.recv().await {
        users.push(n.user_id);
    }
    assert_eq!(users, vec![1, 2]);
}
