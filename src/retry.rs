//! Retry logic with linear backoff
//!
//! A chapter attempt is retried only when its failure is transient. The wait
//! before retry `n` is `retry_delay * n`; there is no jitter and no exponential
//! growth. `max_retries = 0` means exactly one attempt and no wait.
//!
//! The retry loop holds nothing while it sleeps, so concurrency permits taken
//! inside an attempt are already released during backoff. Cancelling a retry is
//! done by dropping its future: no further attempts are issued.
//!
//! # Example
//!
//! ```no_run
//! use scripture_dl::retry::execute_with_retry;
//! use scripture_dl::config::RetryConfig;
//! use scripture_dl::{FetchError, WorkItem};
//!
//! # async fn example() {
//! let config = RetryConfig::default();
//! let item = WorkItem::new("Jude", 1, 0);
//! let outcome = execute_with_retry(&config, &item, |_attempt| async {
//!     Ok::<_, FetchError>("<html>...</html>".to_string())
//! })
//! .await;
//! assert_eq!(outcome.attempts, 1);
//! # }
//! ```

use std::future::Future;

use crate::config::RetryConfig;
use crate::error::FetchError;
use crate::types::WorkItem;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection errors, interstitial pages) should return `true`.
/// Permanent failures (missing page, cancellation) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Final result of a retried operation together with the attempts it consumed
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Success value, or the last error seen
    pub result: Result<T, E>,
    /// Attempts made, including the first (always >= 1)
    pub attempts: u32,
}

/// Run `operation` for `item`, retrying transient failures with linear backoff.
///
/// `operation` receives the 1-based attempt number.
pub async fn execute_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    item: &WorkItem,
    operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    execute_with_retry_observed(config, item, operation, |_, _| {}).await
}

/// Like [`execute_with_retry`], calling `on_retry(attempt, error)` before each backoff wait.
pub async fn execute_with_retry_observed<F, Fut, T, E, O>(
    config: &RetryConfig,
    item: &WorkItem,
    mut operation: F,
    mut on_retry: O,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
    O: FnMut(u32, &E),
{
    let mut attempt: u32 = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(
                        book = %item.book,
                        chapter = item.chapter,
                        attempts = attempt,
                        "Chapter succeeded after retry"
                    );
                }
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(e) if e.is_retryable() && attempt <= config.max_retries => {
                let delay = config.delay_for(attempt);

                tracing::warn!(
                    book = %item.book,
                    chapter = item.chapter,
                    error = %e,
                    attempt = attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis(),
                    "Chapter attempt failed, retrying"
                );
                on_retry(attempt, &e);

                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        book = %item.book,
                        chapter = item.chapter,
                        error = %e,
                        attempts = attempt,
                        "Chapter failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(
                        book = %item.book,
                        chapter = item.chapter,
                        error = %e,
                        "Chapter failed with non-retryable error"
                    );
                }
                return RetryOutcome {
                    result: Err(e),
                    attempts: attempt,
                };
            }
        }
    }
}
