//! Sub-configuration structs with defaults matching the plugin presets.

use serde::{Deserialize, Serialize};

use crate::format::EntityCategory;

/// API quota, concurrency and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Maximum calls per quota window
    pub rate_limit: u32,

    /// Quota window length in seconds
    pub rate_period_secs: u64,

    /// Number of parallel workers
    pub parallel_workers: usize,

    /// Max attempts for a single call, transient failures included
    pub retry_attempts: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            rate_limit: 25,
            rate_period_secs: 1,
            parallel_workers: 4,
            retry_attempts: 5,
        }
    }
}

/// Object detection / labeling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    /// Number of ranked label columns to emit per row
    pub num_objects: u32,

    /// Minimum label confidence requested from the API, 0-100 scale
    pub minimum_score: f32,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            num_objects: 5,
            minimum_score: 0.0,
        }
    }
}

/// Unsafe content moderation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Minimum match confidence, 0-100 scale matching the API's native scale
    pub minimum_score: f32,

    /// Entity categories to emit columns for
    pub categories: Vec<EntityCategory>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            minimum_score: 50.0,
            categories: vec![],
        }
    }
}
