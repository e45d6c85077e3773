//! Sliding-window rate limiter shared by all workers.
//!
//! Enforces "at most N calls per trailing window of length T". Admission is
//! serialized behind one async mutex; a worker that cannot be admitted sleeps
//! until the oldest timestamp ages out of the window and tries again, so no
//! worker is starved indefinitely under a valid configuration.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::ConfigError;

/// Shared admission gate for API calls.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    period: Duration,
    stamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_calls` per trailing `period`.
    pub fn new(max_calls: u32, period: Duration) -> Result<Self, ConfigError> {
        if max_calls == 0 {
            return Err(ConfigError::Validation(
                "rate limit must allow at least one call per period".into(),
            ));
        }
        if period.is_zero() {
            return Err(ConfigError::Validation(
                "rate limit period must be > 0".into(),
            ));
        }
        Ok(Self {
            max_calls: max_calls as usize,
            period,
            stamps: Mutex::new(VecDeque::with_capacity(max_calls as usize)),
        })
    }

    /// Block until issuing one more call stays within the quota, then record
    /// the admission.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut stamps = self.stamps.lock().await;
                let now = Instant::now();
                while stamps
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.period)
                {
                    stamps.pop_front();
                }
                if stamps.len() < self.max_calls {
                    stamps.push_back(now);
                    return;
                }
                match stamps.front() {
                    Some(oldest) => *oldest + self.period - now,
                    None => Duration::ZERO,
                }
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// The configured quota window length.
    pub fn period(&self) -> Duration {
        self.period
    }
}
