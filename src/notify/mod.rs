//! Notification delivery
//!
//! The scheduler hands `Notification` values to a bounded channel; the
//! delivery task drains it into a `NotificationSink`. Delivery failures are
//! logged and dropped, never reported back to the poller.

pub mod render;
pub mod telegram;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::core::derive::DerivedValues;
use crate::core::evaluator::{AlertKind, Crossing};
use crate::core::events::{log_event, AlertEvent};
use crate::core::registry::{SubscriptionKey, UserId};

pub use telegram::{command_loop, parse_command, BotCommand, TelegramClient, TelegramSink};

/// One threshold crossing addressed to one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub user_id: UserId,
    pub token_address: String,
    pub kind: AlertKind,
    pub threshold: f64,
    pub current_value: f64,
    pub timestamp: DateTime<Utc>,
    /// The crossing is the graduation threshold
    pub graduated: bool,
    /// Latest known values for rendering; either may be unavailable
    pub progress: Option<f64>,
    pub market_cap: Option<f64>,
}

impl Notification {
    pub fn from_crossing(
        key: &SubscriptionKey,
        crossing: &Crossing,
        observed: &DerivedValues,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: key.user_id,
            token_address: key.token_address.clone(),
            kind: crossing.kind,
            threshold: crossing.threshold,
            current_value: crossing.current_value,
            timestamp,
            graduated: crossing.is_graduation(),
            progress: observed.progress,
            market_cap: observed.market_cap,
        }
    }
}

/// Delivery errors
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The messaging API answered but refused the message (blocked bot, bad chat id, ...)
    #[error("Delivery rejected ({status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("Delivery network error: {0}")]
    Network(#[source] reqwest::Error),
}

// Request URLs embed the bot token; strip them before the error can be logged
impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Network(err.without_url())
    }
}

/// Outbound notification sink
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;

    /// Sink identifier used in logs
    fn sink_name(&self) -> &'static str;
}

/// Drain notifications into `sink` until shutdown or until every sender is dropped.
///
/// Returns the number of notifications delivered successfully.
pub async fn delivery_task(
    sink: Arc<dyn NotificationSink>,
    mut notification_rx: mpsc::Receiver<Notification>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> u64 {
    info!(sink = sink.sink_name(), "Delivery task started");
    let mut delivered: u64 = 0;
    let mut failed: u64 = 0;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!(delivered, failed, "Delivery task shutting down");
                break;
            }
            maybe = notification_rx.recv() => {
                let Some(notification) = maybe else {
                    info!(delivered, failed, "Notification channel closed");
                    break;
                };

                match sink.deliver(&notification).await {
                    Ok(()) => {
                        delivered += 1;
                        debug!(
                            user_id = notification.user_id,
                            kind = %notification.kind,
                            threshold = notification.threshold,
                            "Notification delivered"
                        );
                    }
                    Err(e) => {
                        failed += 1;
                        log_event(&AlertEvent::delivery_failed(
                            notification.user_id,
                            &notification.token_address,
                            &e,
                        ));
                    }
                }
            }
        }
    }

    delivered
}
