//! Configuration loader for YAML files
//!
//! This module handles loading and validating configuration from YAML files.

use std::path::Path;

use crate::error::{AppError, Result};

use super::types::AppConfig;

/// Load configuration from a YAML file
///
/// Missing sections fall back to their defaults; the result is validated
/// before it is returned.
///
/// # Example
/// ```ignore
/// use std::path::Path;
/// use bonding_alert::config::load_config;
///
/// let config = load_config(Path::new("config.yaml"))?;
/// ```
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(AppError::Config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    parse(&content, Some(path))
}

/// Load configuration from a YAML string (useful for testing)
pub fn load_config_from_str(yaml_content: &str) -> Result<AppConfig> {
    parse(yaml_content, None)
}

fn parse(yaml_content: &str, origin: Option<&Path>) -> Result<AppConfig> {
    let config: AppConfig = serde_yaml::from_str(yaml_content).map_err(|e| match origin {
        Some(path) => AppError::Config(format!("YAML parse error in '{}': {}", path.display(), e)),
        None => AppError::Config(format!("YAML parse error: {}", e)),
    })?;

    config.validate()?;
    Ok(config)
}

// ============================================================================
// Tests
// ============================================================================
