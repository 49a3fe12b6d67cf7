//! Error types for scripture-dl
//!
//! Errors come in two layers:
//! - [`FetchError`] describes why a single chapter could not be produced. These
//!   are captured per work-item and reported inside a [`JobResult`](crate::types::JobResult),
//!   never raised out of a job.
//! - [`Error`] is the job-level error: configuration problems, unknown book names,
//!   cancellation, and the single-chapter path's terminal failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for scripture-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for scripture-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_requests")
        key: Option<String>,
    },

    /// A requested book has no entry in the reference table
    #[error("unknown book: {0}")]
    UnknownBook(String),

    /// The job was cancelled before all chapters resolved
    #[error("job cancelled")]
    Cancelled,

    /// A single-chapter download ended in a terminal failure
    #[error("chapter download failed: {0}")]
    Chapter(#[from] FetchError),

    /// HTTP client construction or transport setup failed
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A spawned job task panicked or was aborted from outside
    #[error("job task failed: {0}")]
    JobTask(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Classification of a per-chapter failure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Connection refused, DNS failure, reset, or an unexpected status code
    TransientNetwork,
    /// The attempt exceeded its per-attempt timeout
    Timeout,
    /// The reference is bad or the page does not exist (404, 410, 400)
    PermanentRequest,
    /// The page was fetched but did not contain a recognisable passage
    Parse,
    /// The job was cancelled while this chapter was pending
    Cancelled,
    /// The chapter's task died or never reported an outcome
    Internal,
}

impl FetchErrorKind {
    /// Whether failures of this kind are worth another attempt
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            FetchErrorKind::TransientNetwork | FetchErrorKind::Timeout | FetchErrorKind::Parse
        )
    }
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FetchErrorKind::TransientNetwork => "transient network error",
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::PermanentRequest => "permanent request error",
            FetchErrorKind::Parse => "parse error",
            FetchErrorKind::Cancelled => "cancelled",
            FetchErrorKind::Internal => "internal error",
        };
        write!(f, "{s}")
    }
}

/// Failure of one fetch-and-parse attempt for one chapter
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct FetchError {
    /// What went wrong
    pub kind: FetchErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl FetchError {
    /// Create a new error of the given kind
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Connection-level or unexpected-status failure
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::TransientNetwork, message)
    }

    /// Bad reference / missing page
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::PermanentRequest, message)
    }

    /// Malformed or unrecognised page content
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Parse, message)
    }

    /// Attempt ran past its deadline
    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::new(
            FetchErrorKind::Timeout,
            format!("attempt exceeded {}ms", timeout.as_millis()),
        )
    }

    /// Job cancellation reached this chapter
    pub fn cancelled() -> Self {
        Self::new(FetchErrorKind::Cancelled, "job cancelled")
    }

    /// Classify an HTTP status that is not a success.
    ///
    /// Not-found style statuses mean the reference itself is wrong and will
    /// never succeed; everything else is assumed to be a server-side hiccup.
    pub fn from_status(status: reqwest::StatusCode, url: &str) -> Self {
        use reqwest::StatusCode;

        match status {
            StatusCode::NOT_FOUND | StatusCode::GONE | StatusCode::BAD_REQUEST => {
                Self::permanent(format!("HTTP {status} for {url}"))
            }
            _ => Self::transient(format!("HTTP {status} for {url}")),
        }
    }

    /// Classify a transport error from reqwest
    pub fn from_reqwest(err: &reqwest::Error, timeout: std::time::Duration) -> Self {
        if err.is_timeout() {
            return Self::timeout(timeout);
        }
        if let Some(status) = err.status() {
            let url = err.url().map(|u| u.as_str()).unwrap_or("<unknown>");
            return Self::from_status(status, url);
        }
        if err.is_connect() {
            return Self::transient(format!("connection failed: {err}"));
        }
        Self::transient(err.to_string())
    }
}
