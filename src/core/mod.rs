//! Core module - derivation, registry, threshold evaluation, scheduling, commands, logging
//!
//! This module uses **explicit re-exports** instead of glob exports
//! (`pub use module::*`) so the public API only changes on purpose.
//!
//! ```ignore
//! use crate::core::{PollScheduler, SubscriptionRegistry, ThresholdEvaluator};
//! ```

pub mod channels;
pub mod commands;
pub mod derive;
pub mod evaluator;
pub mod events;
pub mod logging;
pub mod registry;
pub mod scheduler;

// Explicit re-exports for derive module
pub use derive::{bonding_curve_progress, derive, market_cap, DerivedValues};

// Explicit re-exports for evaluator module
pub use evaluator::{
    AlertKind, AlertedThresholds, Crossing, Evaluation, ThresholdEvaluator, ThresholdSet,
    GRADUATION_THRESHOLD,
};

// Explicit re-exports for registry module
pub use registry::{
    SharedRegistry, SubscriptionEntry, SubscriptionHandle, SubscriptionKey, SubscriptionRegistry,
    SubscriptionState, UserId,
};

// Explicit re-exports for scheduler module
pub use scheduler::{CycleReport, PollScheduler, Track};

// Explicit re-exports for commands module
pub use commands::{
    validate_token_address, CommandError, CommandResult, CommandService, GraduatingToken,
    Monitored, SubscriptionSummary, TokenStatus, TrendingToken,
};

// Explicit re-exports for channels module
pub use channels::{ChannelBundle, DEFAULT_CHANNEL_CAPACITY};

// Explicit re-exports for events module
pub use events::{log_event, AlertEvent, AlertEventType};

// Explicit re-exports for logging module
pub use logging::{
    init_logging, init_logging_with_config, sanitize, LoggingConfig, SanitizedValue,
    DEFAULT_LOG_LEVEL, SENSITIVE_FIELD_PATTERNS,
};
