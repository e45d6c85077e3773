//! Parallel, rate-limited, retried dispatch of one API call per input row.
//!
//! One tokio task per row, bounded by a semaphore sized to the worker count.
//! Each task waits on the shared rate limiter, then runs the retry-wrapped
//! call. Results are written into a slot vector indexed by the originating
//! row, so the returned sequence is always aligned to input order no matter
//! how completion order shuffles.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use crate::api::{RateLimiter, RetryPolicy};
use crate::error::{ApiError, Result};
use crate::schema::ApiColumns;
use crate::types::{CallResult, ErrorHandling, Row};

/// Runs the per-row call across a bounded worker pool.
///
/// Owns the rate limiter and retry policy for the duration of one run; a new
/// dispatcher is built per run, never reused.
pub struct Dispatcher {
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    workers: usize,
    mode: ErrorHandling,
}

impl Dispatcher {
    pub fn new(
        limiter: RateLimiter,
        retry: RetryPolicy,
        workers: usize,
        mode: ErrorHandling,
    ) -> Self {
        Self {
            limiter: Arc::new(limiter),
            retry,
            workers: workers.max(1),
            mode,
        }
    }

    /// Execute `call` once per row and return one [`CallResult`] per row, in
    /// input order.
    ///
    /// Under [`ErrorHandling::Log`] a persistent call error becomes a
    /// `Failure` result for that row and the run continues. Under
    /// [`ErrorHandling::Fail`] the first persistent error stops submission of
    /// further work and the run returns the error; partial results are
    /// discarded.
    pub async fn run<F, Fut>(&self, rows: &[Row], call: F) -> Result<Vec<CallResult>>
    where
        F: Fn(Row) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<String, ApiError>> + Send,
    {
        let total = rows.len();
        tracing::info!("Dispatching {total} API calls across {} workers", self.workers);

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let call = Arc::new(call);
        let aborted = Arc::new(AtomicBool::new(false));
        let first_error: Arc<Mutex<Option<ApiError>>> = Arc::new(Mutex::new(None));
        let completed = Arc::new(AtomicUsize::new(0));
        let fail_fast = self.mode == ErrorHandling::Fail;

        let mut handles = Vec::with_capacity(total);
        for (index, row) in rows.iter().enumerate() {
            if fail_fast && aborted.load(Ordering::SeqCst) {
                break;
            }
            let permit = semaphore.clone().acquire_owned().await;
            if permit.is_err() {
                tracing::warn!("Dispatch semaphore closed unexpectedly, stopping submission");
                break;
            }

            let limiter = self.limiter.clone();
            let retry = self.retry.clone();
            let call = call.clone();
            let aborted = aborted.clone();
            let first_error = first_error.clone();
            let completed = completed.clone();
            let row = row.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                if fail_fast && aborted.load(Ordering::SeqCst) {
                    return (index, None);
                }

                limiter.acquire().await;
                let outcome = retry.run(|| call(row.clone())).await;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!("Completed call {done}/{total} (row {index})");

                match outcome {
                    Ok(response) => (index, Some(CallResult::Success(response))),
                    Err(e) => {
                        if fail_fast {
                            aborted.store(true, Ordering::SeqCst);
                            if let Ok(mut slot) = first_error.lock() {
                                slot.get_or_insert(e);
                            }
                            (index, None)
                        } else {
                            tracing::warn!("Row {index} failed permanently: {e}");
                            let failure = CallResult::Failure {
                                error_type: e.kind().to_string(),
                                error_message: e.to_string(),
                                error_raw: format!("{e:?}"),
                            };
                            (index, Some(failure))
                        }
                    }
                }
            }));
        }

        let mut slots: Vec<Option<CallResult>> = vec![None; total];
        for handle in handles {
            match handle.await {
                Ok((index, result)) => slots[index] = result,
                Err(e) => {
                    tracing::error!("Dispatch task panicked: {e}");
                    if fail_fast {
                        aborted.store(true, Ordering::SeqCst);
                        if let Ok(mut slot) = first_error.lock() {
                            slot.get_or_insert(ApiError::Call {
                                message: format!("dispatch task panicked: {e}"),
                                status_code: None,
                            });
                        }
                    }
                }
            }
        }

        if fail_fast {
            let error = first_error.lock().ok().and_then(|mut slot| slot.take());
            if let Some(e) = error {
                return Err(e.into());
            }
        }

        let results: Vec<CallResult> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    // Only reachable for a panicked task in Log mode
                    tracing::warn!("No result collected for row {index}");
                    CallResult::Failure {
                        error_type: "DispatchTaskError".to_string(),
                        error_message: "call task did not produce a result".to_string(),
                        error_raw: String::new(),
                    }
                })
            })
            .collect();

        let failures = results.iter().filter(|r| !r.is_success()).count();
        tracing::info!(
            "Dispatched {total} calls: {} succeeded, {failures} failed",
            total - failures
        );
        Ok(results)
    }
}

/// Merge call results into their rows as the four generated API columns.
///
/// Every row receives all four columns (empty strings where not applicable)
/// so the whole batch shares one schema; successes fill `response`, failures
/// fill the three error columns.
pub fn attach_results(rows: &[Row], results: &[CallResult], api_columns: &ApiColumns) -> Vec<Row> {
    rows.iter()
        .zip(results)
        .map(|(row, result)| {
            let mut row = row.clone();
            for name in api_columns.names() {
                row.set(name, serde_json::Value::String(String::new()));
            }
            match result {
                CallResult::Success(response) => {
                    row.set(&api_columns.response, serde_json::Value::String(response.clone()));
                }
                CallResult::Failure {
                    error_type,
                    error_message,
                    error_raw,
                } => {
                    row.set(
                        &api_columns.error_message,
                        serde_json::Value::String(error_message.clone()),
                    );
                    row.set(
                        &api_columns.error_type,
                        serde_json::Value::String(error_type.clone()),
                    );
                    row.set(
                        &api_columns.error_raw,
                        serde_json::Value::String(error_raw.clone()),
                    );
                }
            }
            row
        })
        .collect()
}
