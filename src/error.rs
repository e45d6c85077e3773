//! Error types for the sightline batch analysis pipeline.
//!
//! Errors are layered by component so callers can match on the failure class
//! that matters to them: configuration problems are fatal before any work
//! starts, transient API errors are retried, and everything else splits on
//! the run-wide error-handling mode.

use thiserror::Error;

/// Top-level error type for sightline operations.
#[derive(Error, Debug)]
pub enum SightlineError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// API call errors that escaped the dispatch boundary (fail-fast mode)
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Column name generation errors
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Response formatting errors
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// File/object store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Image annotation errors
    #[error("Annotation error: {0}")]
    Annotate(#[from] AnnotateError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Errors raised by a single API call.
///
/// `RateLimited` and `TransientIo` are the two transient classes the retry
/// policy recovers from; everything else is persistent.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The remote service rejected the call for exceeding its quota
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// A transient transport problem (timeout, connection reset, 5xx)
    #[error("Transient I/O failure: {0}")]
    TransientIo(String),

    /// Any other call failure
    #[error("API call failed{}: {message}", status_code.map(|c| format!(" (HTTP {c})")).unwrap_or_default())]
    Call {
        message: String,
        status_code: Option<u16>,
    },
}

impl ApiError {
    /// Short class name recorded in the `error_type` output column.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::RateLimited(_) => "RateLimited",
            ApiError::TransientIo(_) => "TransientIo",
            ApiError::Call { .. } => "ApiCallError",
        }
    }

    /// Whether the retry policy should attempt this call again.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::RateLimited(_) | ApiError::TransientIo(_))
    }
}

/// Column name generation errors. Always fatal regardless of the
/// error-handling mode: exhaustion indicates a caller defect, not bad data.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// No unique candidate found within the suffix bound
    #[error("Failed to generate a unique column name for '{name}' after {attempts} attempts")]
    NamingExhausted { name: String, attempts: u32 },
}

/// Response formatting errors.
#[derive(Error, Debug)]
pub enum FormatError {
    /// A response string was not valid JSON (fail-fast mode only)
    #[error("Invalid JSON in response: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// File/object store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested path does not exist in the store
    #[error("Path not found in store: {0}")]
    NotFound(String),

    /// Underlying I/O failure
    #[error("Store I/O error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Image annotation errors.
#[derive(Error, Debug)]
pub enum AnnotateError {
    /// The source image could not be decoded
    #[error("Could not decode image at {path}: {message}")]
    Decode { path: String, message: String },

    /// The annotated image could not be re-encoded
    #[error("Could not encode annotated image for {path}: {message}")]
    Encode { path: String, message: String },

    /// Fetch or upload against the image store failed
    #[error("Image store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for sightline results.
pub type Result<T> = std::result::Result<T, SightlineError>;
