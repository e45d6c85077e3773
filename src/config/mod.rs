//! Configuration for a sightline run.
//!
//! The host application (recipe runner, CLI, service) resolves a config file
//! path and hands it to [`Config::load_from`]; all values carry defaults so a
//! partial file is fine. Validation runs at load time — configuration errors
//! are fatal before any work starts.

mod types;
mod validate;

pub use types::*;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::ErrorHandling;

/// Root configuration structure for a sightline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API quota, concurrency and retry settings
    pub api: ApiConfig,

    /// Object detection / labeling settings
    pub labeling: LabelingConfig,

    /// Unsafe content moderation settings
    pub moderation: ModerationConfig,

    /// Run-wide error-handling mode
    pub error_handling: ErrorHandling,
}

impl Config {
    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// The period of the API quota window.
    pub fn rate_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.api.rate_period_secs)
    }
}
