//! Shared test helpers: a scripted fetcher and downloader constructors.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::downloader::BibleDownloader;
use crate::error::FetchError;
use crate::fetch::ChapterFetcher;
use crate::parser::BibleGatewayParser;
use crate::types::WorkItem;

type Key = (String, u32);

/// A minimal passage page with `verses` verses for `item`
pub(crate) fn fake_page(item: &WorkItem, verses: u32) -> String {
    let mut page = String::from(r#"<html><body><div class="passage-text">"#);
    for verse in 1..=verses {
        page.push_str(&format!(
            r#"<span class="text X-{ch}-{verse}"><sup class="versenum">{verse} </sup>{book} {ch}:{verse}</span>"#,
            ch = item.chapter,
            book = item.book,
        ));
    }
    page.push_str("</div></body></html>");
    page
}

/// In-memory [`ChapterFetcher`] with scripted failures, delays and instrumentation.
///
/// Unscripted chapters succeed with a three-verse page.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    scripted: Mutex<HashMap<Key, VecDeque<Result<String, FetchError>>>>,
    always_fail: Mutex<HashMap<Key, FetchError>>,
    delay: Option<fn(&WorkItem) -> Duration>,
    calls: Mutex<HashMap<Key, u32>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Delay every fetch by `delay(item)`
    pub(crate) fn with_delay(mut self, delay: fn(&WorkItem) -> Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Return `errors` for the first attempts at `book chapter`, then succeed
    pub(crate) fn failing_first(self, book: &str, chapter: u32, errors: Vec<FetchError>) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .insert((book.to_string(), chapter), errors.into_iter().map(Err).collect());
        self
    }

    /// Return raw `pages` for the first attempts at `book chapter`
    pub(crate) fn serving(self, book: &str, chapter: u32, pages: Vec<String>) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .insert((book.to_string(), chapter), pages.into_iter().map(Ok).collect());
        self
    }

    /// Fail every attempt at `book chapter`
    pub(crate) fn always_failing(self, book: &str, chapter: u32, error: FetchError) -> Self {
        self.always_fail
            .lock()
            .unwrap()
            .insert((book.to_string(), chapter), error);
        self
    }

    pub(crate) fn calls(&self, book: &str, chapter: u32) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(&(book.to_string(), chapter))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the fetch future is dropped
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ChapterFetcher for FakeFetcher {
    async fn fetch(
        &self,
        _translation: &str,
        item: &WorkItem,
        _timeout: Duration,
    ) -> Result<String, FetchError> {
        let key = (item.book.clone(), item.chapter);
        *self.calls.lock().unwrap().entry(key.clone()).or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay(item)).await;
        }

        if let Some(error) = self.always_fail.lock().unwrap().get(&key) {
            return Err(error.clone());
        }
        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(result) => result,
            None => Ok(fake_page(item, 3)),
        }
    }
}

/// Config with fast retries suitable for tests
pub(crate) fn test_config(max_concurrent_requests: usize, max_retries: u32) -> Config {
    let mut config = Config::default();
    config.download.max_concurrent_requests = max_concurrent_requests;
    config.download.timeout = Duration::from_secs(5);
    config.retry.max_retries = max_retries;
    config.retry.retry_delay = Duration::from_millis(10);
    config
}

/// Downloader over `fetcher` with the real parser
pub(crate) fn create_test_downloader(config: Config, fetcher: Arc<FakeFetcher>) -> BibleDownloader {
    BibleDownloader::with_components(config, fetcher, Arc::new(BibleGatewayParser::new())).unwrap()
}
