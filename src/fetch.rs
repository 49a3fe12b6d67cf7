//! Chapter page retrieval
//!
//! [`ChapterFetcher`] is the seam between the orchestrator and the network. The
//! production implementation, [`HttpChapterFetcher`], issues one GET per chapter
//! through a shared `reqwest::Client` (which owns connection pooling and TLS) and
//! classifies every failure as retryable or permanent.

use std::time::Duration;

use url::Url;

use crate::config::SourceConfig;
use crate::error::{Error, FetchError, Result};
use crate::types::WorkItem;

/// Abstraction over chapter page fetching, enabling testability.
#[async_trait::async_trait]
pub trait ChapterFetcher: Send + Sync {
    /// Retrieve the raw page for `item` in `translation`.
    ///
    /// Implementations must give up after `timeout` and report
    /// [`FetchErrorKind::Timeout`](crate::error::FetchErrorKind::Timeout).
    async fn fetch(
        &self,
        translation: &str,
        item: &WorkItem,
        timeout: Duration,
    ) -> std::result::Result<String, FetchError>;
}

/// Production [`ChapterFetcher`] that requests passage pages over HTTP(S).
#[derive(Clone, Debug)]
pub struct HttpChapterFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpChapterFetcher {
    /// Build a fetcher with its own connection pool from source settings
    pub fn new(source: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(source.user_agent.clone())
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Self::with_client(client, &source.base_url)
    }

    /// Build a fetcher that shares an existing client
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            Error::config("base_url", format!("invalid base_url '{base_url}': {e}"))
        })?;
        // Url::join drops the last path segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    /// Passage page URL for one chapter
    pub fn passage_url(&self, translation: &str, item: &WorkItem) -> Url {
        let mut url = self
            .base_url
            .join("passage/")
            .unwrap_or_else(|_| self.base_url.clone());
        url.query_pairs_mut()
            .append_pair("search", &format!("{} {}", item.book, item.chapter))
            .append_pair("version", translation);
        url
    }
}

#[async_trait::async_trait]
impl ChapterFetcher for HttpChapterFetcher {
    async fn fetch(
        &self,
        translation: &str,
        item: &WorkItem,
        timeout: Duration,
    ) -> std::result::Result<String, FetchError> {
        let url = self.passage_url(translation, item);
        tracing::debug!(book = %item.book, chapter = item.chapter, url = %url, "Fetching chapter");

        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status, url.as_str()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&e, timeout))
    }
}
