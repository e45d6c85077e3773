//! Analysis API trait and payload types.
//!
//! Defines the interface one remote classification service implements: one
//! operation per use case, each accepting either raw image bytes or a
//! remote-object reference the service fetches itself.

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};

use crate::error::ApiError;

/// Reference to an object the API can fetch directly from object storage,
/// instead of receiving the bytes inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub bucket: String,
    pub key: String,
}

/// Image payload for one API call.
#[derive(Debug, Clone)]
pub enum ImagePayload {
    /// Base64-encoded image bytes sent inline
    Bytes {
        data: String,
        /// MIME type (e.g. "image/jpeg", "image/png")
        media_type: String,
    },
    /// Bucket + key reference resolved by the service
    Remote(RemoteObject),
}

impl ImagePayload {
    /// Create an inline payload from raw bytes and a format identifier
    /// (e.g. "jpeg", "png", "webp").
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        let media_type = match format {
            "jpeg" | "jpg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            other => {
                tracing::warn!("Unknown image format '{other}', defaulting to image/jpeg");
                "image/jpeg"
            }
        };

        Self::Bytes {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }

    /// The JSON fragment describing this image in a request body.
    pub fn to_request_value(&self) -> Value {
        match self {
            ImagePayload::Bytes { data, .. } => json!({ "Bytes": data }),
            ImagePayload::Remote(obj) => json!({
                "S3Object": { "Bucket": obj.bucket, "Name": obj.key }
            }),
        }
    }
}

/// Trait the remote classification service implements.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (callers hold `Arc<dyn AnalysisApi>` for dynamic dispatch).
///
/// Implementations must surface rate-limit rejections as
/// [`ApiError::RateLimited`] and transient transport problems as
/// [`ApiError::TransientIo`] so the retry policy can distinguish them from
/// persistent failures.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Service name for logging.
    fn name(&self) -> &str;

    /// Detect object labels in an image.
    async fn detect_labels(
        &self,
        image: &ImagePayload,
        max_labels: u32,
        min_confidence: f32,
    ) -> Result<Value, ApiError>;

    /// Detect text in an image (with sentiment analysis of the result).
    async fn detect_text(&self, image: &ImagePayload) -> Result<Value, ApiError>;

    /// Detect unsafe content moderation labels in an image.
    async fn detect_moderation_labels(
        &self,
        image: &ImagePayload,
        min_confidence: f32,
    ) -> Result<Value, ApiError>;
}
