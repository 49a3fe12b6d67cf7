//! Job entry points.
//!
//! Every work-item of a job runs as its own task on a [`JoinSet`]. Tasks share
//! one [`ConcurrencyLimiter`], so the fetch bound is job-wide no matter how many
//! books the job spans. Outcomes come back as task return values and go
//! straight into the [`ResultAggregator`].

use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::books;
use crate::error::{Error, FetchError, FetchErrorKind, Result};
use crate::limiter::ConcurrencyLimiter;
use crate::types::{ChapterRecord, Event, JobRequest, JobResult, WorkItem};

use super::BibleDownloader;
use super::aggregate::ResultAggregator;
use super::chapter_task::{ChapterTaskContext, run_chapter};
use super::expand::{expand_books, normalize_items};

/// A job running in the background
///
/// Dropping the handle does not stop the job; call [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct JobHandle {
    cancel_token: CancellationToken,
    limiter: ConcurrencyLimiter,
    handle: JoinHandle<Result<JobResult>>,
}

impl JobHandle {
    /// Stop the job. [`join`](Self::join) then returns [`Error::Cancelled`].
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// The job's concurrency limiter, for inspection
    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Whether the job has resolved (successfully, by error, or by cancellation)
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the job's result
    pub async fn join(self) -> Result<JobResult> {
        self.handle
            .await
            .map_err(|e| Error::JobTask(e.to_string()))?
    }
}

impl BibleDownloader {
    /// Download the books of `request` and return them in request order.
    ///
    /// Chapters that fail are listed in [`JobResult::failed`]; only an invalid
    /// request, an unknown book, or cancellation is an error.
    pub async fn run(&self, request: &JobRequest) -> Result<JobResult> {
        request.validate()?;
        let items = expand_books(&request.books)?;
        let limiter = ConcurrencyLimiter::new(request.max_concurrent_requests)?;
        let job_token = self.cancel_token.child_token();
        self.execute_job(request, items, limiter, job_token, None)
            .await
    }

    /// Like [`run`](Self::run), additionally stopping when `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        request: &JobRequest,
        cancel: CancellationToken,
    ) -> Result<JobResult> {
        request.validate()?;
        let items = expand_books(&request.books)?;
        let limiter = ConcurrencyLimiter::new(request.max_concurrent_requests)?;
        let job_token = self.cancel_token.child_token();
        self.execute_job(request, items, limiter, job_token, Some(cancel))
            .await
    }

    /// Start a job in the background
    pub fn spawn_job(&self, request: JobRequest) -> Result<JobHandle> {
        request.validate()?;
        let items = expand_books(&request.books)?;
        let limiter = ConcurrencyLimiter::new(request.max_concurrent_requests)?;
        let cancel_token = self.cancel_token.child_token();

        let downloader = self.clone();
        let job_limiter = limiter.clone();
        let job_token = cancel_token.clone();
        let handle = tokio::spawn(async move {
            downloader
                .execute_job(&request, items, job_limiter, job_token, None)
                .await
        });

        Ok(JobHandle {
            cancel_token,
            limiter,
            handle,
        })
    }

    /// Re-run an explicit list of work-items, typically [`JobResult::failed_items`].
    ///
    /// The request supplies translation and settings; its `books` are ignored.
    /// Items keep their sequence keys, so a re-run result merges cleanly with
    /// the original one.
    pub async fn run_items(&self, request: &JobRequest, items: &[WorkItem]) -> Result<JobResult> {
        request.validate()?;
        let items = normalize_items(items)?;
        let limiter = ConcurrencyLimiter::new(request.max_concurrent_requests)?;
        let job_token = self.cancel_token.child_token();
        self.execute_job(request, items, limiter, job_token, None)
            .await
    }

    /// Download `books` of `translation` with the configured defaults
    pub async fn download_books<I, S>(&self, translation: &str, books: I) -> Result<JobResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request = JobRequest::from_config(&self.config, translation).with_books(books);
        self.run(&request).await
    }

    /// Download one chapter through the same limiter and retry path as a job.
    ///
    /// A terminal failure is returned as [`Error::Chapter`].
    pub async fn download_chapter(
        &self,
        translation: &str,
        book: &str,
        chapter: u32,
    ) -> Result<ChapterRecord> {
        let entry = books::find(book).ok_or_else(|| Error::UnknownBook(book.to_string()))?;
        if chapter == 0 || chapter > entry.chapters {
            return Err(Error::config(
                "chapter",
                format!(
                    "{} has {} chapters, {} requested",
                    entry.name, entry.chapters, chapter
                ),
            ));
        }

        let request = JobRequest::from_config(&self.config, translation).with_books([entry.name]);
        request.validate()?;
        let limiter = ConcurrencyLimiter::new(request.max_concurrent_requests)?;
        let job_token = self.cancel_token.child_token();
        let item = WorkItem::new(entry.name, chapter, 0);

        let result = self
            .execute_job(&request, vec![item], limiter, job_token, None)
            .await?;

        if let Some(record) = result.completed.into_iter().next() {
            return Ok(record);
        }
        let error = result
            .failed
            .into_iter()
            .next()
            .map(|failed| failed.error)
            .unwrap_or_else(|| FetchError::new(FetchErrorKind::Internal, "no outcome recorded"));
        Err(Error::Chapter(error))
    }

    /// Download several translations at once, one independent job each.
    ///
    /// Results are returned in the order of `translations`. Each job has its
    /// own limiter, so up to `translations.len() * max_concurrent_requests`
    /// fetches may be in flight.
    pub async fn download_translations<T, B>(
        &self,
        translations: &[T],
        books: &[B],
    ) -> Vec<Result<JobResult>>
    where
        T: AsRef<str>,
        B: AsRef<str>,
    {
        let requests: Vec<JobRequest> = translations
            .iter()
            .map(|translation| {
                JobRequest::from_config(&self.config, translation.as_ref())
                    .with_books(books.iter().map(|b| b.as_ref().to_string()))
            })
            .collect();

        futures::future::join_all(requests.iter().map(|request| self.run(request))).await
    }

    /// Dispatch `items` and wait for all of them, or for cancellation.
    async fn execute_job(
        &self,
        request: &JobRequest,
        items: Vec<WorkItem>,
        limiter: ConcurrencyLimiter,
        job_token: CancellationToken,
        caller_token: Option<CancellationToken>,
    ) -> Result<JobResult> {
        let translation = request.translation.clone();
        let total = items.len();

        let ctx = Arc::new(ChapterTaskContext {
            translation: translation.clone(),
            fetcher: Arc::clone(&self.fetcher),
            parser: Arc::clone(&self.parser),
            limiter: limiter.clone(),
            retry: request.retry_config(),
            timeout: request.timeout,
            event_tx: self.event_tx.clone(),
            cancel_token: job_token.clone(),
        });

        tracing::info!(
            translation = %translation,
            chapters = total,
            max_concurrent_requests = limiter.max_permits(),
            max_retries = request.max_retries,
            "Starting download job"
        );
        self.emit_event(Event::JobStarted {
            translation: translation.clone(),
            total_chapters: total,
        });

        let mut aggregator = ResultAggregator::new(translation.clone(), &items);
        let mut join_set = JoinSet::new();
        for item in items {
            join_set.spawn(run_chapter(Arc::clone(&ctx), item));
        }

        loop {
            tokio::select! {
                biased;

                _ = cancelled(&job_token, caller_token.as_ref()) => {
                    job_token.cancel();
                    limiter.close();
                    join_set.shutdown().await;

                    tracing::warn!(
                        translation = %translation,
                        resolved = aggregator.resolved(),
                        pending = aggregator.pending(),
                        "Download job cancelled"
                    );
                    self.emit_event(Event::JobCancelled { translation });
                    return Err(Error::Cancelled);
                }

                joined = join_set.join_next() => match joined {
                    Some(Ok(outcome)) => {
                        aggregator.record(outcome);
                    }
                    Some(Err(e)) => {
                        tracing::error!(
                            translation = %translation,
                            error = %e,
                            "Chapter task died"
                        );
                    }
                    None => break,
                },
            }
        }

        let result = aggregator.finish();

        tracing::info!(
            translation = %translation,
            completed = result.completed.len(),
            failed = result.failed.len(),
            verses = result.verse_count(),
            peak_in_flight = limiter.peak_in_flight(),
            elapsed_ms = result.elapsed().num_milliseconds(),
            "Download job finished"
        );
        self.emit_event(Event::JobFinished {
            translation,
            completed: result.completed.len(),
            failed: result.failed.len(),
        });

        Ok(result)
    }
}

/// Resolves when either token is cancelled
async fn cancelled(job: &CancellationToken, caller: Option<&CancellationToken>) {
    match caller {
        Some(caller) => {
            tokio::select! {
                _ = job.cancelled() => {}
                _ = caller.cancelled() => {}
            }
        }
        None => job.cancelled().await,
    }
}
