//! Core types for scripture-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{Config, RetryConfig};
use crate::error::{Error, FetchError, Result};

/// Ordering key of a work-item: (position of the book in the job, chapter number)
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SequenceKey {
    /// Index of the book in the job's expanded book list
    pub book_position: usize,
    /// 1-based chapter number
    pub chapter: u32,
}

/// One fetch-and-parse unit: a single chapter of a single book
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    /// Book name as it appears in the reference table
    pub book: String,
    /// 1-based chapter number
    pub chapter: u32,
    /// Position in the job's canonical ordering
    pub sequence: SequenceKey,
}

impl WorkItem {
    /// Create a work-item for `book` `chapter`, placed at `book_position` in its job
    pub fn new(book: impl Into<String>, chapter: u32, book_position: usize) -> Self {
        Self {
            book: book.into(),
            chapter,
            sequence: SequenceKey {
                book_position,
                chapter,
            },
        }
    }
}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// Sequence key first; the remaining fields keep `cmp` consistent with `Eq`.
impl Ord for WorkItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sequence
            .cmp(&other.sequence)
            .then_with(|| self.book.cmp(&other.book))
            .then_with(|| self.chapter.cmp(&other.chapter))
    }
}

impl std::fmt::Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.book, self.chapter)
    }
}

/// A parsed chapter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    /// Translation abbreviation (e.g., "NIV")
    pub translation: String,
    /// Book name
    pub book: String,
    /// 1-based chapter number
    pub chapter: u32,
    /// Verse texts in source order (may be empty)
    pub verses: Vec<String>,
}

/// A work-item that ended in a terminal failure
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    /// The chapter that could not be produced
    pub item: WorkItem,
    /// The last error observed
    pub error: FetchError,
    /// How many attempts were made (0 if the chapter never started)
    pub attempts: u32,
}

/// Parameters of one download job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Translation abbreviation (e.g., "NIV", "KJV")
    pub translation: String,
    /// Books in the order they should appear in the result (empty = all books)
    pub books: Vec<String>,
    /// Job-wide bound on simultaneous fetches
    pub max_concurrent_requests: usize,
    /// Retries after the first attempt of each chapter
    pub max_retries: u32,
    /// Base linear backoff delay
    pub retry_delay: Duration,
    /// Per-attempt timeout
    pub timeout: Duration,
}

impl JobRequest {
    /// Request for `translation` with built-in defaults (5 concurrent, 3 retries, 1s, 30s)
    pub fn new(translation: impl Into<String>) -> Self {
        Self::from_config(&Config::default(), translation)
    }

    /// Request for `translation` with defaults taken from `config`
    pub fn from_config(config: &Config, translation: impl Into<String>) -> Self {
        Self {
            translation: translation.into(),
            books: Vec::new(),
            max_concurrent_requests: config.download.max_concurrent_requests,
            max_retries: config.retry.max_retries,
            retry_delay: config.retry.retry_delay,
            timeout: config.download.timeout,
        }
    }

    /// Restrict the job to these books, in this order
    #[must_use]
    pub fn with_books<I, S>(mut self, books: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.books = books.into_iter().map(Into::into).collect();
        self
    }

    /// Set the concurrency bound
    #[must_use]
    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    /// Set the retry budget
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base backoff delay
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the per-attempt timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry settings of this request
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
        }
    }

    /// Reject requests that cannot run
    pub fn validate(&self) -> Result<()> {
        if self.translation.trim().is_empty() {
            return Err(Error::config("translation", "translation must not be empty"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(Error::config(
                "max_concurrent_requests",
                "max_concurrent_requests must be at least 1",
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::config("timeout", "timeout must be positive"));
        }
        Ok(())
    }
}

/// Outcome of a job: what succeeded and what did not
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// Translation the job downloaded
    pub translation: String,
    /// Parsed chapters in canonical (book, chapter) order
    pub completed: Vec<ChapterRecord>,
    /// Chapters that ended in a terminal failure, in canonical order
    pub failed: Vec<FailedItem>,
    /// When dispatch started
    pub started_at: DateTime<Utc>,
    /// When the last chapter resolved
    pub finished_at: DateTime<Utc>,
}

impl JobResult {
    /// Every chapter succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of work-items the job covered
    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len()
    }

    /// The work-items to hand back to a re-run
    pub fn failed_items(&self) -> Vec<WorkItem> {
        self.failed.iter().map(|f| f.item.clone()).collect()
    }

    /// Total verses across all completed chapters
    pub fn verse_count(&self) -> usize {
        self.completed.iter().map(|c| c.verses.len()).sum()
    }

    /// Completed chapters of one book, in chapter order
    pub fn chapters_for<'a>(&'a self, book: &'a str) -> impl Iterator<Item = &'a ChapterRecord> {
        self.completed.iter().filter(move |c| c.book == book)
    }

    /// Wall-clock duration of the job
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Event emitted during a job's lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Work-items were expanded and dispatch is starting
    JobStarted {
        /// Translation being downloaded
        translation: String,
        /// Number of chapters in the job
        total_chapters: usize,
    },

    /// A chapter attempt failed and will be retried
    ChapterRetrying {
        /// Book name
        book: String,
        /// Chapter number
        chapter: u32,
        /// The attempt that failed (1-based)
        attempt: u32,
        /// Error message of the failed attempt
        error: String,
    },

    /// A chapter was fetched and parsed
    ChapterCompleted {
        /// Book name
        book: String,
        /// Chapter number
        chapter: u32,
        /// Number of verses parsed
        verses: usize,
    },

    /// A chapter ended in a terminal failure
    ChapterFailed {
        /// Book name
        book: String,
        /// Chapter number
        chapter: u32,
        /// Final error message
        error: String,
    },

    /// All chapters resolved
    JobFinished {
        /// Translation downloaded
        translation: String,
        /// Chapters that succeeded
        completed: usize,
        /// Chapters that failed
        failed: usize,
    },

    /// The job was cancelled before all chapters resolved
    JobCancelled {
        /// Translation being downloaded
        translation: String,
    },
}
