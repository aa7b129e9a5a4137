//! Alert Event System
//!
//! Structured event types for logging the alert lifecycle. Every event uses
//! the same field schema so a subscription's timeline can be reconstructed
//! from logs by filtering on `user_id` and `token`.
//!
//! # Event Types
//!
//! - **SubscriptionAdded / SubscriptionRemoved**: registry changes from commands
//! - **ThresholdCrossed**: a threshold fired for a subscription
//! - **Graduated**: bonding-curve progress reached 100%
//! - **PollFailed**: a metrics fetch failed or timed out
//! - **DeliveryFailed**: a notification could not be delivered
//!
//! ```ignore
//! use crate::core::events::{AlertEvent, log_event};
//!
//! log_event(&AlertEvent::subscription_added(42, "2Z4F...pump"));
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::core::evaluator::{AlertKind, Crossing};
use crate::core::logging::short_address;
use crate::core::registry::UserId;

/// Alert event types for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEventType {
    // Subscription Events
    SubscriptionAdded,
    SubscriptionRemoved,

    // Alert Events
    ThresholdCrossed,
    Graduated,

    // Failure Events
    PollFailed,
    DeliveryFailed,

    // System Events
    ServiceStarted,
    ServiceShutdown,
}

impl fmt::Display for AlertEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertEventType::SubscriptionAdded => write!(f, "SUBSCRIPTION_ADDED"),
            AlertEventType::SubscriptionRemoved => write!(f, "SUBSCRIPTION_REMOVED"),
            AlertEventType::ThresholdCrossed => write!(f, "THRESHOLD_CROSSED"),
            AlertEventType::Graduated => write!(f, "GRADUATED"),
            AlertEventType::PollFailed => write!(f, "POLL_FAILED"),
            AlertEventType::DeliveryFailed => write!(f, "DELIVERY_FAILED"),
            AlertEventType::ServiceStarted => write!(f, "SERVICE_STARTED"),
            AlertEventType::ServiceShutdown => write!(f, "SERVICE_SHUTDOWN"),
        }
    }
}

/// Alert event with all context fields for structured logging
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub event_type: AlertEventType,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<UserId>,
    pub token: Option<String>,
    pub kind: Option<AlertKind>,
    pub threshold: Option<f64>,
    pub current_value: Option<f64>,
    /// Polling track ("bonding_curve" / "price")
    pub track: Option<String>,
    pub error: Option<String>,
    pub subscriptions: Option<usize>,
}

impl AlertEvent {
    /// Create a new event with the current timestamp
    pub fn new(event_type: AlertEventType) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            user_id: None,
            token: None,
            kind: None,
            threshold: None,
            current_value: None,
            track: None,
            error: None,
            subscriptions: None,
        }
    }

    fn for_subscription(event_type: AlertEventType, user_id: UserId, token: &str) -> Self {
        Self {
            user_id: Some(user_id),
            token: Some(token.to_string()),
            ..Self::new(event_type)
        }
    }

    pub fn subscription_added(user_id: UserId, token: &str) -> Self {
        Self::for_subscription(AlertEventType::SubscriptionAdded, user_id, token)
    }

    pub fn subscription_removed(user_id: UserId, token: &str) -> Self {
        Self::for_subscription(AlertEventType::SubscriptionRemoved, user_id, token)
    }

    /// THRESHOLD_CROSSED, or GRADUATED for the graduation crossing
    pub fn threshold_crossed(user_id: UserId, token: &str, crossing: &Crossing) -> Self {
        let event_type = if crossing.is_graduation() {
            AlertEventType::Graduated
        } else {
            AlertEventType::ThresholdCrossed
        };
        Self {
            kind: Some(crossing.kind),
            threshold: Some(crossing.threshold),
            current_value: Some(crossing.current_value),
            ..Self::for_subscription(event_type, user_id, token)
        }
    }

    pub fn poll_failed(
        user_id: UserId,
        token: &str,
        track: &str,
        error: impl fmt::Display,
    ) -> Self {
        Self {
            track: Some(track.to_string()),
            error: Some(error.to_string()),
            ..Self::for_subscription(AlertEventType::PollFailed, user_id, token)
        }
    }

    pub fn delivery_failed(user_id: UserId, token: &str, error: impl fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::for_subscription(AlertEventType::DeliveryFailed, user_id, token)
        }
    }

    pub fn service_started() -> Self {
        Self::new(AlertEventType::ServiceStarted)
    }

    pub fn service_shutdown(subscriptions: usize) -> Self {
        Self {
            subscriptions: Some(subscriptions),
            ..Self::new(AlertEventType::ServiceShutdown)
        }
    }
}

/// Log an alert event using structured tracing fields
///
/// Failures go out at WARN (poll) or ERROR (delivery); everything else at INFO.
pub fn log_event(event: &AlertEvent) {
    let event_type = event.event_type.to_string();
    let timestamp = event.timestamp.to_rfc3339();
    let token = event.token.as_deref().map(short_address);
    let kind = event.kind.map(|k| k.to_string());

    match event.event_type {
        AlertEventType::PollFailed => {
            warn!(
                event_type = %event_type,
                timestamp = %timestamp,
                user_id = ?event.user_id,
                token = ?token,
                track = ?event.track,
                error = ?event.error,
                "Metrics poll failed"
            );
        }
        AlertEventType::DeliveryFailed => {
            error!(
                event_type = %event_type,
                timestamp = %timestamp,
                user_id = ?event.user_id,
                token = ?token,
                error = ?event.error,
                "Notification delivery failed"
            );
        }
        _ => {
            info!(
                event_type = %event_type,
                timestamp = %timestamp,
                user_id = ?event.user_id,
                token = ?token,
                kind = ?kind,
                threshold = ?event.threshold,
                current_value = ?event.current_value,
                subscriptions = ?event.subscriptions,
                ""
            );
        }
    }
}
