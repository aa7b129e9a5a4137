//! Shared test utilities for notification delivery
//!
//! `RecordingSink` captures every delivered notification and can be told to
//! reject messages for specific users.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::core::registry::UserId;
use crate::notify::{DeliveryError, Notification, NotificationSink};

#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<Notification>>,
    failing_users: HashSet<UserId>,
    attempts: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that rejects every notification addressed to `user_id`
    pub fn failing_for(user_id: UserId) -> Self {
        Self {
            failing_users: HashSet::from([user_id]),
            ..Self::default()
        }
    }

    /// Successfully delivered notifications, in delivery order
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().unwrap().clone()
    }

    /// Delivery attempts, including rejected ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing_users.contains(&notification.user_id) {
            return Err(DeliveryError::Rejected {
                status: 403,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "recording"
    }
}
