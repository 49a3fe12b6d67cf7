//! Download orchestration split into focused submodules.
//!
//! The `BibleDownloader` struct and its methods are organized by concern:
//! - [`expand`] - Book list to ordered work-items
//! - [`chapter_task`] - One work-item through limiter, fetch, parse and retry
//! - [`aggregate`] - Reassembly of outcomes into canonical order
//! - [`job`] - Job entry points, dispatch and cancellation

pub mod aggregate;
mod chapter_task;
mod expand;
mod job;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use aggregate::{ChapterOutcome, ResultAggregator};
pub use job::JobHandle;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Result;
use crate::fetch::{ChapterFetcher, HttpChapterFetcher};
use crate::parser::{BibleGatewayParser, ChapterParser};
use crate::types::{Event, JobRequest};

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// One downloader can run any number of jobs, sequentially or at the same
/// time. Each job gets its own concurrency limiter; the HTTP client, parser
/// and event channel are shared.
#[derive(Clone)]
pub struct BibleDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Page source for chapter fetches
    pub(crate) fetcher: Arc<dyn ChapterFetcher>,
    /// Page to record transform
    pub(crate) parser: Arc<dyn ChapterParser>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Parent of every job token; cancelling it cancels every running job
    pub(crate) cancel_token: CancellationToken,
}

impl BibleDownloader {
    /// Create a downloader that fetches from the configured site over HTTP
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use scripture_dl::{BibleDownloader, config::Config};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let downloader = BibleDownloader::new(Config::default())?;
    /// let result = downloader.download_books("KJV", ["Jude"]).await?;
    /// assert_eq!(result.completed.len(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpChapterFetcher::new(&config.source)?;
        Self::with_components(config, Arc::new(fetcher), Arc::new(BibleGatewayParser::new()))
    }

    /// Create a downloader with a custom fetcher and parser
    pub fn with_components(
        config: Config,
        fetcher: Arc<dyn ChapterFetcher>,
        parser: Arc<dyn ChapterParser>,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        tracing::debug!(
            max_concurrent_requests = config.download.max_concurrent_requests,
            max_retries = config.retry.max_retries,
            base_url = %config.source.base_url,
            "Downloader created"
        );

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            parser,
            event_tx,
            cancel_token: CancellationToken::new(),
        })
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. A subscriber that falls more than
    /// 1000 events behind misses the oldest ones (`RecvError::Lagged`).
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use scripture_dl::{BibleDownloader, config::Config};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let downloader = BibleDownloader::new(Config::default())?;
    /// let mut events = downloader.subscribe();
    /// tokio::spawn(async move {
    ///     while let Ok(event) = events.recv().await {
    ///         tracing::info!(?event, "download event");
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Cancel every job of this downloader and all its clones.
    ///
    /// Cancellation is permanent: jobs started afterwards fail immediately
    /// with [`Error::Cancelled`](crate::Error::Cancelled).
    pub fn cancel(&self) {
        tracing::info!("Cancelling all download jobs");
        self.cancel_token.cancel();
    }

    /// Whether [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Get the current configuration
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// A request for the configured default translation with configured defaults
    pub fn request(&self) -> JobRequest {
        JobRequest::from_config(&self.config, self.config.download.default_translation.clone())
    }

    /// Emit an event to all subscribers
    ///
    /// With no subscribers the event is dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
