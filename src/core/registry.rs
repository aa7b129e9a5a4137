//! Subscription registry
//!
//! In-memory store of (user, token) monitoring subscriptions. The registry
//! lock only guards membership; each subscription carries its own locks so
//! a slow poll on one token never blocks another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use uuid::Uuid;

use crate::core::derive::DerivedValues;
use crate::core::evaluator::AlertedThresholds;

/// Chat identifier of the subscribing user
pub type UserId = i64;

/// Registry key; unique per (user, token) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    pub user_id: UserId,
    pub token_address: String,
}

impl SubscriptionKey {
    pub fn new(user_id: UserId, token_address: impl Into<String>) -> Self {
        Self {
            user_id,
            token_address: token_address.into(),
        }
    }
}

impl std::fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.user_id, self.token_address)
    }
}

/// Mutable per-subscription state, written only by the poll cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionState {
    /// Latest available value per kind; `None` until first successful poll
    pub last_observed: Option<DerivedValues>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub alerted: AlertedThresholds,
    /// Progress has reached the graduation threshold
    pub graduated: bool,
    /// Cleared when graduation stops bonding-curve polling
    pub bonding_curve_active: bool,
}

impl Default for SubscriptionState {
    fn default() -> Self {
        Self {
            last_observed: None,
            last_polled_at: None,
            alerted: AlertedThresholds::default(),
            graduated: false,
            bonding_curve_active: true,
        }
    }
}

impl SubscriptionState {
    /// Fold newly derived values into `last_observed`, keeping the previous
    /// value of any kind that was unavailable this cycle.
    pub fn record_observation(&mut self, derived: DerivedValues, at: DateTime<Utc>) {
        let previous = self.last_observed.unwrap_or_default();
        self.last_observed = Some(DerivedValues {
            progress: derived.progress.or(previous.progress),
            market_cap: derived.market_cap.or(previous.market_cap),
        });
        self.last_polled_at = Some(at);
    }
}

/// A registered subscription, shared between the registry and in-flight polls
#[derive(Debug)]
pub struct SubscriptionEntry {
    pub id: Uuid,
    pub key: SubscriptionKey,
    pub created_at: DateTime<Utc>,
    removed: AtomicBool,
    /// Held for the duration of a poll so polls of one subscription never overlap
    poll_lock: Mutex<()>,
    state: Mutex<SubscriptionState>,
}

/// Shared handle handed out by the registry
pub type SubscriptionHandle = Arc<SubscriptionEntry>;

impl SubscriptionEntry {
    fn new(key: SubscriptionKey) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            created_at: Utc::now(),
            removed: AtomicBool::new(false),
            poll_lock: Mutex::new(()),
            state: Mutex::new(SubscriptionState::default()),
        }
    }

    /// True once removed from the registry; in-flight results must be dropped
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::SeqCst)
    }

    pub async fn begin_poll(&self) -> MutexGuard<'_, ()> {
        self.poll_lock.lock().await
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> SubscriptionState {
        self.state.lock().await.clone()
    }

    pub(crate) async fn state_mut(&self) -> MutexGuard<'_, SubscriptionState> {
        self.state.lock().await
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    entries: HashMap<SubscriptionKey, SubscriptionHandle>,
    /// Token addresses per user, in insertion order
    by_user: HashMap<UserId, Vec<String>>,
}

/// Owns every active subscription. Construct one per process (or per test).
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    inner: RwLock<RegistryInner>,
}

/// Shared registry handle
pub type SharedRegistry = Arc<SubscriptionRegistry>;

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(self)
    }

    /// Register a subscription. Returns false, changing nothing, if the pair exists.
    pub async fn add(&self, user_id: UserId, token_address: &str) -> bool {
        let key = SubscriptionKey::new(user_id, token_address);
        let mut inner = self.inner.write().await;
        if inner.entries.contains_key(&key) {
            return false;
        }
        inner
            .by_user
            .entry(user_id)
            .or_default()
            .push(token_address.to_string());
        inner.entries.insert(key.clone(), Arc::new(SubscriptionEntry::new(key)));
        true
    }

    /// Drop a subscription. A user left with none is dropped entirely.
    pub async fn remove(&self, user_id: UserId, token_address: &str) -> bool {
        let key = SubscriptionKey::new(user_id, token_address);
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.entries.remove(&key) else {
            return false;
        };
        {
            // Waits out an evaluation in progress on this entry
            let _state = entry.state.lock().await;
            entry.removed.store(true, Ordering::SeqCst);
        }

        if let Some(tokens) = inner.by_user.get_mut(&user_id) {
            tokens.retain(|t| t != token_address);
            if tokens.is_empty() {
                inner.by_user.remove(&user_id);
            }
        }
        true
    }

    /// Token addresses for `user_id` in insertion order
    pub async fn list_for_user(&self, user_id: UserId) -> Vec<String> {
        self.inner
            .read()
            .await
            .by_user
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn get(&self, user_id: UserId, token_address: &str) -> Option<SubscriptionHandle> {
        let key = SubscriptionKey::new(user_id, token_address);
        self.inner.read().await.entries.get(&key).cloned()
    }

    /// Snapshot of every registered subscription.
    ///
    /// Later additions/removals do not affect the returned vector; a removed
    /// entry is still safe to poll and reports `is_removed()`.
    pub async fn all_active(&self) -> Vec<SubscriptionHandle> {
        self.inner.read().await.entries.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn user_count(&self) -> usize {
        self.inner.read().await.by_user.len()
    }
}
