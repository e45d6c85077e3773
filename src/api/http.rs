//! HTTP implementation of the analysis API.
//!
//! Posts JSON request bodies (inline base64 bytes or a remote-object
//! reference) to one endpoint per operation, with bearer authentication.
//! HTTP status codes are mapped onto the error taxonomy: 429 is a rate-limit
//! rejection, 5xx and transport failures are transient I/O, everything else
//! non-2xx is a persistent call error.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::client::{AnalysisApi, ImagePayload};
use crate::error::ApiError;

/// Analysis client over a REST endpoint.
pub struct HttpAnalysisClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpAnalysisClient {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, operation: &str, body: Value) -> Result<Value, ApiError> {
        let url = format!("{}/{operation}", self.endpoint);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ApiError::TransientIo(format!("{operation} request failed: {e}"))
                } else {
                    ApiError::Call {
                        message: format!("{operation} request failed: {e}"),
                        status_code: None,
                    }
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::classify_status(operation, status.as_u16(), text));
        }

        resp.json().await.map_err(|e| ApiError::Call {
            message: format!("{operation} returned unparseable body: {e}"),
            status_code: Some(status.as_u16()),
        })
    }

    fn classify_status(operation: &str, code: u16, body: String) -> ApiError {
        let message = format!("{operation} HTTP {code}: {body}");
        if code == 429 {
            ApiError::RateLimited(message)
        } else if (500..=599).contains(&code) {
            ApiError::TransientIo(message)
        } else {
            ApiError::Call {
                message,
                status_code: Some(code),
            }
        }
    }
}

#[async_trait]
impl AnalysisApi for HttpAnalysisClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn detect_labels(
        &self,
        image: &ImagePayload,
        max_labels: u32,
        min_confidence: f32,
    ) -> Result<Value, ApiError> {
        let body = json!({
            "Image": image.to_request_value(),
            "MaxLabels": max_labels,
            "MinConfidence": min_confidence,
        });
        self.post("detect-labels", body).await
    }

    async fn detect_text(&self, image: &ImagePayload) -> Result<Value, ApiError> {
        let body = json!({ "Image": image.to_request_value() });
        self.post("detect-text", body).await
    }

    async fn detect_moderation_labels(
        &self,
        image: &ImagePayload,
        min_confidence: f32,
    ) -> Result<Value, ApiError> {
        let body = json!({
            "Image": image.to_request_value(),
            "MinConfidence": min_confidence,
        });
        self.post("detect-moderation-labels", body).await
    }
}
