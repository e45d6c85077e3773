//! Sightline - bulk image/text analysis over rate-limited remote APIs.
//!
//! Sightline drives one classification API call per input row across a
//! bounded worker pool, converts the heterogeneous JSON responses into a
//! uniform tabular shape with collision-free column names, and optionally
//! renders annotated images from the geometric fields of the responses.
//!
//! # Architecture
//!
//! ```text
//! Rows → Dispatcher (RateLimiter + RetryPolicy, N workers)
//!      → CallResult per row, in input order
//!      → ResponseFormatter (generic / labels / sentiment / moderation)
//!      → Output rows with namespaced columns
//!      → (optional) ImageAnnotator → annotated PNGs in the output store
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sightline::{
//!     attach_results, format_batch, Config, Dispatcher, HttpAnalysisClient,
//!     ImagePayload, LocalStore, ObjectDetectionFormatter, ObjectStore,
//!     RateLimiter, RetryPolicy, Row,
//! };
//!
//! #[tokio::main]
//! async fn main() -> sightline::Result<()> {
//!     let config = Config::load_from("sightline.toml".as_ref())?;
//!     let store: Arc<dyn ObjectStore> = Arc::new(LocalStore::new("./images"));
//!     let api = Arc::new(HttpAnalysisClient::new("https://vision.example.com/v1", "key"));
//!
//!     let rows: Vec<Row> = store.list().await?.iter()
//!         .filter(|p| sightline::is_supported_image(p))
//!         .map(|p| Row::from_image_path(p))
//!         .collect();
//!
//!     let limiter = RateLimiter::new(config.api.rate_limit, config.rate_period())?;
//!     let retry = RetryPolicy::new(config.api.retry_attempts, config.rate_period());
//!     let dispatcher = Dispatcher::new(
//!         limiter, retry, config.api.parallel_workers, config.error_handling,
//!     );
//!
//!     let fetch_store = store.clone();
//!     let results = dispatcher
//!         .run(&rows, move |row| {
//!             let api = api.clone();
//!             let store = fetch_store.clone();
//!             async move {
//!                 let path = row.get_str(sightline::IMAGE_PATH_COLUMN).unwrap_or("");
//!                 let payload = match store.remote_location(path) {
//!                     Some(remote) => ImagePayload::Remote(remote),
//!                     None => {
//!                         let bytes = store.fetch(path).await.map_err(|e| {
//!                             sightline::ApiError::TransientIo(e.to_string())
//!                         })?;
//!                         ImagePayload::from_bytes(&bytes, "jpeg")
//!                     }
//!                 };
//!                 let response = api.detect_labels(&payload, 5, 0.0).await?;
//!                 Ok(response.to_string())
//!             }
//!         })
//!         .await?;
//!
//!     let formatter = ObjectDetectionFormatter::new(
//!         &["image_path".to_string()], 5, "object_api", config.error_handling,
//!     )?;
//!     let merged = attach_results(&rows, &results, &formatter.base().api_columns);
//!     let output = format_batch(&formatter, merged)?;
//!     println!("{} rows formatted", output.len());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod annotate;
pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod output;
pub mod schema;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use annotate::{draw_annotations, AnnotateStats, ImageAnnotator};
pub use api::{
    AnalysisApi, HttpAnalysisClient, ImagePayload, RateLimiter, RemoteObject, RetryPolicy,
};
pub use config::{ApiConfig, Config, LabelingConfig, ModerationConfig};
pub use dispatch::{attach_results, Dispatcher};
pub use error::{
    AnnotateError, ApiError, ConfigError, FormatError, Result, SchemaError, SightlineError,
    StoreError,
};
pub use format::{
    format_batch, safe_json_loads, EntityCategory, FormatterBase, GenericFormatter,
    ModerationSummary, ObjectDetectionFormatter, ResponseFormatter, SentimentFormatter,
    UnsafeContentFormatter,
};
pub use output::{apply_column_descriptions, ColumnMeta, OutputFormat, TableWriter};
pub use schema::{generate_unique, ApiColumns, DEFAULT_COLUMN_PREFIX};
pub use store::{is_supported_image, LocalStore, ObjectStore};
pub use types::{BoundingBox, CallResult, ErrorHandling, Row, IMAGE_PATH_COLUMN};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    /// Full tabular path: dispatch with one failing row, merge results,
    /// format, and check the finalized batch.
    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_labeling_batch() {
        let rows = vec![
            Row::from_image_path("cat.jpg"),
            Row::from_image_path("broken.jpg"),
        ];

        let limiter = RateLimiter::new(10, Duration::from_secs(1)).unwrap();
        let retry = RetryPolicy::new(2, Duration::from_millis(10));
        let dispatcher = Dispatcher::new(limiter, retry, 2, ErrorHandling::Log);

        let results = dispatcher
            .run(&rows, |row| async move {
                match row.get_str(IMAGE_PATH_COLUMN) {
                    Some("cat.jpg") => Ok(
                        r#"{"Labels":[{"Name":"Cat","Confidence":91.2}]}"#.to_string()
                    ),
                    _ => Err(ApiError::Call {
                        message: "invalid image".to_string(),
                        status_code: Some(400),
                    }),
                }
            })
            .await
            .unwrap();

        let formatter = ObjectDetectionFormatter::new(
            &[IMAGE_PATH_COLUMN.to_string()],
            1,
            "object_api",
            ErrorHandling::Log,
        )
        .unwrap();
        let merged = attach_results(&rows, &results, &formatter.base().api_columns);
        let output = format_batch(&formatter, merged).unwrap();

        assert_eq!(output.len(), 2);
        assert_eq!(output[0].get_str("object_api_label_1_name"), Some("Cat"));
        assert_eq!(output[0].get_str("object_api_error_type"), Some(""));

        // The failed row keeps its place, carries error columns, and
        // formats to empty derived columns
        assert_eq!(output[1].get_str(IMAGE_PATH_COLUMN), Some("broken.jpg"));
        assert_eq!(output[1].get_str("object_api_error_type"), Some("ApiCallError"));
        assert_eq!(output[1].get_str("object_api_label_1_name"), Some(""));

        // Diagnostic columns sit at the end, error_raw included since the
        // failed row populated it
        let names: Vec<&str> = output[1].column_names().collect();
        assert_eq!(
            &names[names.len() - 4..],
            &[
                "object_api_response",
                "object_api_error_message",
                "object_api_error_type",
                "object_api_error_raw"
            ]
        );
    }
}
