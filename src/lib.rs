//! Bonding Alert - bonding-curve and market-cap alerts for pump.fun tokens
//!
//! - Metrics source (Bitquery GraphQL)
//! - Progress / market-cap derivation and threshold evaluation
//! - Per-subscription polling on two tracks
//! - Telegram commands and alert delivery

pub mod config;
pub mod core;
pub mod error;
pub mod notify;
pub mod source;

pub use error::AppError;
