//! # scripture-dl
//!
//! Concurrent, fault-tolerant downloader for structured scripture text.
//!
//! ## Design Philosophy
//!
//! scripture-dl is designed to be:
//! - **Bounded** - One job never has more than `max_concurrent_requests` fetches in flight
//! - **Partial-failure tolerant** - A failed chapter is reported, not raised
//! - **Deterministic** - Results come back in request order whatever order they finished in
//! - **Library-first** - No CLI and no file writers; records are `serde::Serialize`
//!
//! ## Quick Start
//!
//! ```no_run
//! use scripture_dl::{BibleDownloader, Config, JobRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = BibleDownloader::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let request = JobRequest::new("KJV").with_books(["Ruth", "Jude"]);
//!     let result = downloader.run(&request).await?;
//!     for chapter in &result.completed {
//!         println!("{} {}: {} verses", chapter.book, chapter.chapter, chapter.verses.len());
//!     }
//!     for failed in &result.failed {
//!         eprintln!("{} failed: {}", failed.item, failed.error);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Static table of books and chapter counts
pub mod books;
/// Configuration types
pub mod config;
/// Download orchestration (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Chapter page retrieval
pub mod fetch;
/// Job-wide concurrency limiting
pub mod limiter;
/// Passage page parsing
pub mod parser;
/// Retry logic with linear backoff
pub mod retry;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, RetryConfig, SourceConfig};
pub use downloader::{BibleDownloader, ChapterOutcome, JobHandle, ResultAggregator};
pub use error::{Error, FetchError, FetchErrorKind, Result};
pub use fetch::{ChapterFetcher, HttpChapterFetcher};
pub use limiter::{ConcurrencyLimiter, ConcurrencyPermit};
pub use parser::{BibleGatewayParser, ChapterParser};
pub use retry::IsRetryable;
pub use types::{
    ChapterRecord, Event, FailedItem, JobRequest, JobResult, SequenceKey, WorkItem,
};

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Helper function to run a job with graceful signal handling.
///
/// If a termination signal arrives before the job finishes, the job is
/// cancelled and [`Error::Cancelled`] is returned once every in-flight fetch
/// has been released.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use scripture_dl::{BibleDownloader, Config, JobRequest, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = BibleDownloader::new(Config::default())?;
///     let request = JobRequest::new("NIV");
///
///     // Ctrl+C stops the download cleanly
///     let result = run_with_shutdown(&downloader, &request).await?;
///     println!("{} chapters", result.completed.len());
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(
    downloader: &BibleDownloader,
    request: &JobRequest,
) -> Result<JobResult> {
    run_until(downloader, request, wait_for_signal()).await
}

/// Run a job until it finishes or `shutdown` resolves, whichever comes first.
///
/// On shutdown the job is cancelled and this waits for it to wind down, so the
/// result is [`Error::Cancelled`] with every permit released.
pub async fn run_until<F>(
    downloader: &BibleDownloader,
    request: &JobRequest,
    shutdown: F,
) -> Result<JobResult>
where
    F: Future<Output = ()>,
{
    let token = CancellationToken::new();
    let job = downloader.run_with_cancel(request, token.clone());
    tokio::pin!(job);

    tokio::select! {
        result = &mut job => result,
        _ = shutdown => {
            tracing::info!(translation = %request.translation, "Shutdown requested, cancelling download job");
            token.cancel();
            job.await
        }
    }
}

/// Resolves on SIGTERM or SIGINT.
///
/// Registration can fail in restricted environments; whichever signal did
/// register is still honoured, then `ctrl_c` is tried. If nothing can be
/// listened for this never resolves, so the job runs to completion.
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            let received = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            tracing::info!(signal = received, "Received shutdown signal");
        }
        (Ok(mut only), Err(e)) | (Err(e), Ok(mut only)) => {
            tracing::warn!(error = %e, "Could not register both signal handlers, listening on the other only");
            only.recv().await;
            tracing::info!("Received shutdown signal");
        }
        (Err(e), Err(_)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            wait_for_ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::test_helpers::{FakeFetcher, create_test_downloader, test_config};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn slow(_item: &WorkItem) -> Duration {
        Duration::from_secs(2)
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_running_job() {
        let fetcher = Arc::new(FakeFetcher::new().with_delay(slow));
        let downloader = create_test_downloader(test_config(2, 0), fetcher.clone());
        let request = JobRequest::from_config(&downloader.config(), "KJV").with_books(["Ruth"]);
        let started = Instant::now();

        let err = run_until(
            &downloader,
            &request,
            tokio::time::sleep(Duration::from_millis(500)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2), "cancelled before any fetch finished");
        assert_eq!(fetcher.in_flight(), 0, "aborted fetches released their slots");
        assert_eq!(fetcher.total_calls(), 2, "queued chapters never started");
    }

    #[tokio::test(start_paused = true)]
    async fn job_finishing_first_ignores_shutdown() {
        let fetcher = Arc::new(FakeFetcher::new().with_delay(slow));
        let downloader = create_test_downloader(test_config(4, 0), fetcher.clone());
        let request = JobRequest::from_config(&downloader.config(), "KJV").with_books(["Ruth"]);

        let result = run_until(
            &downloader,
            &request,
            tokio::time::sleep(Duration::from_secs(60)),
        )
        .await
        .unwrap();

        assert!(result.is_complete());
        assert_eq!(result.completed.len(), 4);
        assert!(!downloader.is_cancelled(), "shutdown token is local to the call");
    }
}
