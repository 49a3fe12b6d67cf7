//! Chapter task: one work-item through limiter, fetch, parse and retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::error::FetchError;
use crate::fetch::ChapterFetcher;
use crate::limiter::ConcurrencyLimiter;
use crate::parser::ChapterParser;
use crate::retry::execute_with_retry_observed;
use crate::types::{ChapterRecord, Event, WorkItem};

use super::aggregate::ChapterOutcome;

/// Everything a chapter task needs, shared by every task of one job.
pub(crate) struct ChapterTaskContext {
    pub(crate) translation: String,
    pub(crate) fetcher: Arc<dyn ChapterFetcher>,
    pub(crate) parser: Arc<dyn ChapterParser>,
    pub(crate) limiter: ConcurrencyLimiter,
    pub(crate) retry: RetryConfig,
    pub(crate) timeout: Duration,
    pub(crate) event_tx: broadcast::Sender<Event>,
    pub(crate) cancel_token: CancellationToken,
}

/// One attempt: permit, bounded fetch, release, then parse outside the permit.
async fn attempt_chapter(
    ctx: &ChapterTaskContext,
    item: &WorkItem,
) -> Result<ChapterRecord, FetchError> {
    let permit = ctx.limiter.acquire().await?;

    let fetched = match tokio::time::timeout(
        ctx.timeout,
        ctx.fetcher.fetch(&ctx.translation, item, ctx.timeout),
    )
    .await
    {
        Ok(result) => result,
        Err(_elapsed) => Err(FetchError::timeout(ctx.timeout)),
    };

    ctx.limiter.release(permit);

    let raw = fetched?;
    ctx.parser.parse(&raw, &ctx.translation, item)
}

/// Drive one work-item to its final outcome.
///
/// Never panics on a chapter failure; the outcome carries it. If the job is
/// cancelled while the item is pending the outcome is a `Cancelled` failure and
/// no further attempt is made.
pub(crate) async fn run_chapter(ctx: Arc<ChapterTaskContext>, item: WorkItem) -> ChapterOutcome {
    let retried = {
        let ctx_ref: &ChapterTaskContext = &ctx;
        let item_ref = &item;

        tokio::select! {
            biased;

            _ = ctx.cancel_token.cancelled() => None,
            outcome = execute_with_retry_observed(
                &ctx.retry,
                item_ref,
                move |_attempt| attempt_chapter(ctx_ref, item_ref),
                |attempt, err: &FetchError| {
                    ctx_ref
                        .event_tx
                        .send(Event::ChapterRetrying {
                            book: item_ref.book.clone(),
                            chapter: item_ref.chapter,
                            attempt,
                            error: err.to_string(),
                        })
                        .ok();
                },
            ) => Some(outcome),
        }
    };

    let Some(retried) = retried else {
        tracing::debug!(book = %item.book, chapter = item.chapter, "Chapter cancelled");
        return ChapterOutcome {
            item,
            result: Err(FetchError::cancelled()),
            attempts: 0,
        };
    };

    match &retried.result {
        Ok(record) => {
            tracing::debug!(
                book = %item.book,
                chapter = item.chapter,
                verses = record.verses.len(),
                attempts = retried.attempts,
                "Chapter completed"
            );
            ctx.event_tx
                .send(Event::ChapterCompleted {
                    book: item.book.clone(),
                    chapter: item.chapter,
                    verses: record.verses.len(),
                })
                .ok();
        }
        Err(e) => {
            ctx.event_tx
                .send(Event::ChapterFailed {
                    book: item.book.clone(),
                    chapter: item.chapter,
                    error: e.to_string(),
                })
                .ok();
        }
    }

    ChapterOutcome {
        item,
        result: retried.result,
        attempts: retried.attempts,
    }
}
