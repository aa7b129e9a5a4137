//! Poll scheduler
//!
//! Two independent timing tracks re-evaluate every registered subscription:
//! - bonding-curve track: pool balance -> progress thresholds
//! - price track: USD price -> market-cap thresholds
//!
//! Within a cycle subscriptions are polled with bounded parallelism. Every
//! fetch is wrapped in a timeout, and one subscription's failure never
//! affects another. A subscription's own polls are strictly ordered across
//! both tracks through its poll lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{AppConfig, GraduationPolicy, PollingConfig, ProtocolConstants};
use crate::core::derive::{derive, DerivedValues};
use crate::core::evaluator::{AlertKind, ThresholdEvaluator, ThresholdSet};
use crate::core::events::{log_event, AlertEvent};
use crate::core::logging::short_address;
use crate::core::registry::{SharedRegistry, SubscriptionHandle};
use crate::notify::Notification;
use crate::source::{MetricsSource, SourceError, TokenMetrics};

/// Polling track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    BondingCurve,
    Price,
}

impl Track {
    /// The alert kind this track evaluates
    pub fn kind(&self) -> AlertKind {
        match self {
            Track::BondingCurve => AlertKind::BondingCurve,
            Track::Price => AlertKind::MarketCap,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Track::BondingCurve => "bonding_curve",
            Track::Price => "price",
        }
    }

    /// Keep only the value this track is responsible for
    fn restrict(&self, derived: DerivedValues) -> DerivedValues {
        match self {
            Track::BondingCurve => DerivedValues {
                progress: derived.progress,
                market_cap: None,
            },
            Track::Price => DerivedValues {
                progress: None,
                market_cap: derived.market_cap,
            },
        }
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome counts of one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Subscriptions whose fetch completed and were evaluated
    pub polled: usize,
    /// Removed, or inactive on this track
    pub skipped: usize,
    /// Fetch failed or timed out
    pub failed: usize,
    /// Notifications emitted
    pub events: usize,
}

enum PollOutcome {
    Polled { events: usize },
    Skipped,
    Failed,
}

/// Drives periodic re-evaluation of every registered subscription
pub struct PollScheduler {
    source: Arc<dyn MetricsSource>,
    registry: SharedRegistry,
    evaluator: ThresholdEvaluator,
    protocol: ProtocolConstants,
    polling: PollingConfig,
    notification_tx: mpsc::Sender<Notification>,
}

impl PollScheduler {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        registry: SharedRegistry,
        config: &AppConfig,
        notification_tx: mpsc::Sender<Notification>,
    ) -> Self {
        Self {
            source,
            registry,
            evaluator: ThresholdEvaluator::new(ThresholdSet::from_config(&config.thresholds)),
            protocol: config.protocol,
            polling: config.polling.clone(),
            notification_tx,
        }
    }

    /// Run both tracks until shutdown is broadcast
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) {
        info!(
            source = self.source.source_name(),
            bonding_curve_interval = ?self.polling.bonding_curve_interval(),
            price_interval = ?self.polling.price_interval(),
            max_concurrent_polls = self.polling.max_concurrent_polls,
            graduation_policy = %self.polling.graduation_policy,
            "Poll scheduler started"
        );

        let price_shutdown = shutdown_rx.resubscribe();
        tokio::join!(
            self.run_track(
                Track::BondingCurve,
                self.polling.bonding_curve_interval(),
                shutdown_rx
            ),
            self.run_track(Track::Price, self.polling.price_interval(), price_shutdown),
        );

        info!("Poll scheduler stopped");
    }

    async fn run_track(
        &self,
        track: Track,
        period: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut ticker = interval(period);
        // A cycle that overruns its period does not trigger a burst of catch-up cycles
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(track = %track, "Polling track shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.run_cycle(track).await;
                    debug!(
                        track = %track,
                        polled = report.polled,
                        skipped = report.skipped,
                        failed = report.failed,
                        events = report.events,
                        "Cycle complete"
                    );
                }
            }
        }
    }

    /// Poll every registered subscription once on `track`
    pub async fn run_cycle(&self, track: Track) -> CycleReport {
        let subscriptions = self.registry.all_active().await;
        let concurrency = self.polling.max_concurrent_polls.max(1);

        let outcomes: Vec<PollOutcome> = stream::iter(subscriptions)
            .map(|entry| self.poll_subscription(entry, track))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut report = CycleReport::default();
        for outcome in outcomes {
            match outcome {
                PollOutcome::Polled { events } => {
                    report.polled += 1;
                    report.events += events;
                }
                PollOutcome::Skipped => report.skipped += 1,
                PollOutcome::Failed => report.failed += 1,
            }
        }
        report
    }

    async fn poll_subscription(&self, entry: SubscriptionHandle, track: Track) -> PollOutcome {
        // Held across fetch, evaluation and hand-off so this subscription's polls never interleave
        let _poll = entry.begin_poll().await;
        if entry.is_removed() {
            return PollOutcome::Skipped;
        }
        if track == Track::BondingCurve && !entry.snapshot().await.bonding_curve_active {
            return PollOutcome::Skipped;
        }

        let key = &entry.key;
        let metrics = match self.fetch(track, &key.token_address).await {
            Ok(metrics) => metrics,
            // No data for either value is a gap, not a failure
            Err(SourceError::NotFound(_)) => TokenMetrics::empty(&key.token_address),
            Err(e) => {
                if entry.is_removed() {
                    return PollOutcome::Skipped;
                }
                log_event(&AlertEvent::poll_failed(
                    key.user_id,
                    &key.token_address,
                    track.as_str(),
                    &e,
                ));
                return PollOutcome::Failed;
            }
        };

        if entry.is_removed() {
            debug!(
                user_id = key.user_id,
                token = %short_address(&key.token_address),
                track = %track,
                "Subscription removed during poll, discarding result"
            );
            return PollOutcome::Skipped;
        }

        let derived = track.restrict(derive(&metrics, &self.protocol));
        let now = Utc::now();

        // Removal flips the flag under the state lock, so a subscription seen
        // live here cannot emit once `remove` has returned
        let mut state = entry.state_mut().await;
        if entry.is_removed() {
            return PollOutcome::Skipped;
        }

        let evaluation = self.evaluator.evaluate(&state.alerted, &derived);
        state.record_observation(derived, now);

        if evaluation.graduated() {
            state.graduated = true;
            if self.polling.graduation_policy == GraduationPolicy::StopBondingCurve {
                state.bonding_curve_active = false;
            }
        }

        state.alerted = evaluation.alerted;
        let crossings = evaluation.crossings;
        let observed = state.last_observed.unwrap_or_default();

        debug!(
            user_id = key.user_id,
            token = %short_address(&key.token_address),
            track = %track,
            progress = ?derived.progress,
            market_cap = ?derived.market_cap,
            crossings = crossings.len(),
            "Subscription polled"
        );

        for crossing in &crossings {
            log_event(&AlertEvent::threshold_crossed(
                key.user_id,
                &key.token_address,
                crossing,
            ));
            self.hand_off(Notification::from_crossing(key, crossing, &observed, now));
        }
        drop(state);

        PollOutcome::Polled {
            events: crossings.len(),
        }
    }

    /// Queue a notification without waiting on the delivery side
    fn hand_off(&self, notification: Notification) {
        match self.notification_tx.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                log_event(&AlertEvent::delivery_failed(
                    dropped.user_id,
                    &dropped.token_address,
                    "notification queue full, alert dropped",
                ));
            }
            Err(TrySendError::Closed(dropped)) => {
                warn!(
                    user_id = dropped.user_id,
                    "Notification channel closed, dropping alert"
                );
            }
        }
    }

    async fn fetch(&self, track: Track, token_address: &str) -> Result<TokenMetrics, SourceError> {
        let fetch = match track {
            Track::BondingCurve => self.source.fetch_bonding_curve(token_address),
            Track::Price => self.source.fetch_price(token_address),
        };
        match timeout(self.polling.fetch_timeout(), fetch).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(self.polling.fetch_timeout_ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::SubscriptionRegistry;
    use crate::source::test_utils::MockMetricsSource;

    const TOKEN_A: &str = "2Z4FzKBcw48KBD2PaR4wtxo4sYGbS7QqTQCLoQnUpump";
    const TOKEN_B: &str = "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr";

    struct Harness {
        scheduler: Arc<PollScheduler>,
        registry: SharedRegistry,
        source: Arc<MockMetricsSource>,
        rx: mpsc::Receiver<Notification>,
    }

    fn harness_with(source: MockMetricsSource, config: AppConfig) -> Harness {
        harness_with_capacity(source, config, 64)
    }

    fn harness_with_capacity(
        source: MockMetricsSource,
        config: AppConfig,
        capacity: usize,
    ) -> Harness {
        crate::core::logging::init_test_logging("bonding_alert=debug");
        let source = Arc::new(source);
        let registry = SubscriptionRegistry::new().into_shared();
        let (tx, rx) = mpsc::channel(capacity);
        let scheduler = Arc::new(PollScheduler::new(
            source.clone(),
            registry.clone(),
            &config,
            tx,
        ));
        Harness {
            scheduler,
            registry,
            source,
            rx,
        }
    }

    fn harness(source: MockMetricsSource) -> Harness {
        harness_with(source, AppConfig::default())
    }

    fn counts(polled: usize, skipped: usize, failed: usize, events: usize) -> CycleReport {
        CycleReport {
            polled,
            skipped,
            failed,
            events,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<Notification>) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    #[tokio::test]
    async fn test_bonding_curve_cycle_emits_progress_alerts_only() {
        let source = MockMetricsSource::new();
        // ~63.04% progress, $100k market cap
        source.push_values(TOKEN_A, Some(500_000_000), Some(0.0001));
        let mut h = harness(source);
        h.registry.add(1, TOKEN_A).await;

        let report = h.scheduler.run_cycle(Track::BondingCurve).await;
        assert_eq!(report, counts(1, 0, 0, 1));

        let sent = drain(&mut h.rx);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, AlertKind::BondingCurve);
        assert_eq!(sent[0].threshold, 50.0);
        assert!(sent[0].market_cap.is_none());
    }

    #[tokio::test]
    async fn test_price_cycle_emits_market_cap_alerts_in_order() {
        let source = MockMetricsSource::new();
        source.push_values(TOKEN_A, Some(500_000_000), Some(0.0001));
        let mut h = harness(source);
        h.registry.add(1, TOKEN_A).await;

        h.scheduler.run_cycle(Track::Price).await;
        let thresholds: Vec<f64> = drain(&mut h.rx).iter().map(|n| n.threshold).collect();
        assert_eq!(thresholds, vec![10_000.0, 50_000.0, 100_000.0]);
    }

    #[tokio::test]
    async fn test_repeated_cycles_do_not_realert() {
        let source = MockMetricsSource::new();
        source.push_values(TOKEN_A, Some(500_000_000), None);
        let mut h = harness(source);
        h.registry.add(1, TOKEN_A).await;

        h.scheduler.run_cycle(Track::BondingCurve).await;
        let second = h.scheduler.run_cycle(Track::BondingCurve).await;

        assert_eq!(second.events, 0);
        assert_eq!(drain(&mut h.rx).len(), 1);
    }

    #[tokio::test]
    async fn test_data_gap_keeps_alerted_set() {
        let source = MockMetricsSource::new();
        source.push_values(TOKEN_A, Some(500_000_000), Some(0.0001));
        source.push_values(TOKEN_A, None, Some(0.0001));
        let mut h = harness(source);
        h.registry.add(1, TOKEN_A).await;

        h.scheduler.run_cycle(Track::BondingCurve).await;
        let gap = h.scheduler.run_cycle(Track::BondingCurve).await;
        assert_eq!(gap, counts(1, 0, 0, 0));

        let state = h.registry.get(1, TOKEN_A).await.unwrap().snapshot().await;
        assert_eq!(state.alerted.for_kind(AlertKind::BondingCurve), &[50.0]);
        // Previous progress is still the last observed value
        let progress = state.last_observed.unwrap().progress.unwrap();
        assert!((progress - 63.04).abs() < 0.01);
        assert_eq!(drain(&mut h.rx).len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_a_gap_not_a_failure() {
        let mut h = harness(MockMetricsSource::new());
        h.registry.add(1, TOKEN_A).await;

        let report = h.scheduler.run_cycle(Track::Price).await;
        assert_eq!(report, counts(1, 0, 0, 0));
        assert!(drain(&mut h.rx).is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_subscription() {
        let source = MockMetricsSource::new();
        source.push(TOKEN_A, Err("connection refused".into()));
        source.push_values(TOKEN_B, Some(206_900_000), None);
        let mut h = harness(source);
        h.registry.add(1, TOKEN_A).await;
        h.registry.add(1, TOKEN_B).await;

        let report = h.scheduler.run_cycle(Track::BondingCurve).await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.polled, 1);

        let sent = drain(&mut h.rx);
        assert!(sent.iter().all(|n| n.token_address == TOKEN_B));
        assert!(sent.last().unwrap().graduated);

        // Failed subscription keeps an untouched state
        let state = h.registry.get(1, TOKEN_A).await.unwrap().snapshot().await;
        assert!(state.last_observed.is_none());
    }

    #[tokio::test]
    async fn test_slow_fetch_times_out() {
        let source = MockMetricsSource::with_delay(Duration::from_millis(300));
        source.push_values(TOKEN_A, Some(500_000_000), None);
        let mut config = AppConfig::default();
        config.polling.fetch_timeout_ms = 50;
        let h = harness_with(source, config);
        h.registry.add(1, TOKEN_A).await;

        let started = std::time::Instant::now();
        let report = h.scheduler.run_cycle(Track::BondingCurve).await;

        assert_eq!(report.failed, 1);
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_removal_during_inflight_poll_discards_result() {
        let source = MockMetricsSource::with_delay(Duration::from_millis(150));
        source.push_values(TOKEN_A, Some(206_900_000), None);
        let mut h = harness(source);
        h.registry.add(1, TOKEN_A).await;

        let scheduler = h.scheduler.clone();
        let cycle = tokio::spawn(async move { scheduler.run_cycle(Track::BondingCurve).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.registry.remove(1, TOKEN_A).await);

        let report = cycle.await.unwrap();
        assert_eq!(report, counts(0, 1, 0, 0));
        assert!(drain(&mut h.rx).is_empty());
        assert!(h.registry.get(1, TOKEN_A).await.is_none());
    }

    #[tokio::test]
    async fn test_full_notification_queue_does_not_stall_cycle() {
        let source = MockMetricsSource::new();
        source.push_values(TOKEN_A, Some(206_900_000), None);
        source.push_values(TOKEN_B, Some(500_000_000), None);
        let mut h = harness_with_capacity(source, AppConfig::default(), 1);
        h.registry.add(1, TOKEN_A).await;
        h.registry.add(2, TOKEN_B).await;

        // Nobody drains the queue during the cycle
        let report = tokio::time::timeout(
            Duration::from_secs(2),
            h.scheduler.run_cycle(Track::BondingCurve),
        )
        .await
        .expect("cycle must not wait on delivery");

        // 6 crossings for the graduated token, 1 for the other
        assert_eq!(report, counts(2, 0, 0, 7));
        assert_eq!(drain(&mut h.rx).len(), 1);

        // Dropped alerts stay alerted
        let state = h.registry.get(2, TOKEN_B).await.unwrap().snapshot().await;
        assert_eq!(state.alerted.for_kind(AlertKind::BondingCurve), &[50.0]);
        let next = h.scheduler.run_cycle(Track::BondingCurve).await;
        assert_eq!(next.events, 0);
    }

    #[tokio::test]
    async fn test_removed_subscription_emits_nothing_after_remove_returns() {
        let source = MockMetricsSource::with_delay(Duration::from_millis(60));
        source.push_values(TOKEN_A, Some(206_900_000), None);
        let mut h = harness(source);
        h.registry.add(1, TOKEN_A).await;

        let scheduler = h.scheduler.clone();
        let cycle = tokio::spawn(async move { scheduler.run_cycle(Track::BondingCurve).await });

        // Removal racing the end of the fetch: either the poll finished first
        // and all its alerts are queued, or it sees the removal and emits none
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(h.registry.remove(1, TOKEN_A).await);
        let queued_at_removal = drain(&mut h.rx).len();

        let report = cycle.await.unwrap();
        assert!(drain(&mut h.rx).is_empty(), "alert emitted after removal");
        assert!(queued_at_removal == 0 || queued_at_removal == 6);
        assert_eq!(report.events, queued_at_removal);
    }

    #[tokio::test]
    async fn test_graduation_stops_bonding_curve_track() {
        let source = MockMetricsSource::new();
        source.push_values(TOKEN_A, Some(206_900_000), Some(0.00007));
        let mut h = harness(source);
        h.registry.add(1, TOKEN_A).await;

        let first = h.scheduler.run_cycle(Track::BondingCurve).await;
        assert_eq!(first.events, 6);
        assert!(drain(&mut h.rx).last().unwrap().graduated);

        let fetches = h.source.fetches();
        let second = h.scheduler.run_cycle(Track::BondingCurve).await;
        assert_eq!(second, counts(0, 1, 0, 0));
        assert_eq!(h.source.fetches(), fetches);

        // Price track keeps going
        let price = h.scheduler.run_cycle(Track::Price).await;
        assert_eq!(price.polled, 1);
        assert_eq!(price.events, 2);
    }

    #[tokio::test]
    async fn test_continue_policy_keeps_bonding_curve_track() {
        let source = MockMetricsSource::new();
        source.push_values(TOKEN_A, Some(206_900_000), None);
        let mut config = AppConfig::default();
        config.polling.graduation_policy = GraduationPolicy::Continue;
        let h = harness_with(source, config);
        h.registry.add(1, TOKEN_A).await;

        h.scheduler.run_cycle(Track::BondingCurve).await;
        let second = h.scheduler.run_cycle(Track::BondingCurve).await;

        assert_eq!(second, counts(1, 0, 0, 0));
        let state = h.registry.get(1, TOKEN_A).await.unwrap().snapshot().await;
        assert!(state.graduated);
        assert!(state.bonding_curve_active);
    }

    #[tokio::test]
    async fn test_polls_of_one_subscription_never_overlap() {
        let source = MockMetricsSource::with_delay(Duration::from_millis(40));
        source.push_values(TOKEN_A, Some(500_000_000), Some(0.0001));
        let h = harness(source);
        h.registry.add(1, TOKEN_A).await;

        let (a, b) = tokio::join!(
            h.scheduler.run_cycle(Track::BondingCurve),
            h.scheduler.run_cycle(Track::Price),
        );

        assert_eq!(a.polled + b.polled, 2);
        assert_eq!(h.source.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_distinct_subscriptions_poll_in_parallel() {
        let source = MockMetricsSource::with_delay(Duration::from_millis(100));
        source.push_values(TOKEN_A, Some(500_000_000), None);
        source.push_values(TOKEN_B, Some(500_000_000), None);
        let h = harness(source);
        h.registry.add(1, TOKEN_A).await;
        h.registry.add(1, TOKEN_B).await;
        h.registry.add(2, TOKEN_A).await;

        let started = std::time::Instant::now();
        let report = h.scheduler.run_cycle(Track::BondingCurve).await;

        assert_eq!(report.polled, 3);
        assert!(h.source.max_in_flight() > 1);
        assert!(started.elapsed() < Duration::from_millis(280));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let source = MockMetricsSource::new();
        source.push_values(TOKEN_A, Some(500_000_000), Some(0.0001));
        let mut h = harness(source);
        h.registry.add(1, TOKEN_A).await;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let scheduler = h.scheduler.clone();
        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

        // First tick of each track fires immediately
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop")
            .unwrap();

        let kinds: Vec<AlertKind> = drain(&mut h.rx).iter().map(|n| n.kind).collect();
        assert!(kinds.contains(&AlertKind::BondingCurve));
        assert!(kinds.contains(&AlertKind::MarketCap));
    }
}
