//! API call surface: the `AnalysisApi` trait, its HTTP implementation, and
//! the rate-limit / retry machinery that gates every call.

pub mod client;
pub mod http;
pub mod limiter;
pub mod retry;

pub use client::{AnalysisApi, ImagePayload, RemoteObject};
pub use http::HttpAnalysisClient;
pub use limiter::RateLimiter;
pub use retry::RetryPolicy;
