//! Bounded retry for transient API failures.
//!
//! Wraps exactly one underlying call. Only the transient error classes
//! (rate-limit rejection, transient I/O) are retried; the wait between
//! attempts is at least one full rate-limit period so the next attempt is
//! likely to pass the limiter. A call that exhausts its attempts surfaces
//! its last error to the dispatcher, which converts it per the run-wide
//! error-handling mode.

use std::future::Future;
use std::time::Duration;

use crate::error::ApiError;

/// Retry policy for a single per-row call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    wait: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the initial call; `wait` is slept between
    /// attempts and should be the rate-limit period.
    pub fn new(max_attempts: u32, wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            wait,
        }
    }

    /// Run `call` until it succeeds, fails persistently, or exhausts the
    /// attempt bound.
    pub async fn run<F, Fut>(&self, call: F) -> Result<String, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<String, ApiError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !e.is_transient() || attempt >= self.max_attempts {
                        return Err(e);
                    }
                    tracing::warn!(
                        "Transient failure on attempt {attempt}/{}: {e}",
                        self.max_attempts
                    );
                    attempt += 1;
                    tokio::time::sleep(self.wait).await;
                }
            }
        }
    }
}
