//! Configuration module for service settings and YAML loading
//!
//! This module provides:
//! - Configuration types (`AppConfig`, `ThresholdConfig`, `PollingConfig`, ...)
//! - YAML loading functionality (`load_config`)
//! - Credentials from environment variables (`Credentials`)
//! - Transport constants with environment variable overrides

pub mod constants;
mod credentials;
mod loader;
mod types;

// Re-export types
pub use types::{
    AppConfig, DiscoveryConfig, GraduationPolicy, PollingConfig, ProtocolConstants, ThresholdConfig,
};

pub use credentials::{Credentials, CredentialsError};

// Re-export loader functions
pub use loader::{load_config, load_config_from_str};
