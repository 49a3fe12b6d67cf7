//! Config helpers for pointing a downloader at a mock or the real site

use std::time::Duration;

use scripture_dl::{BibleDownloader, Config};
use wiremock::MockServer;

/// Config aimed at `server` with short timeouts and fast retries
pub fn mock_config(server: &MockServer, max_concurrent_requests: usize, max_retries: u32) -> Config {
    let mut config = Config::default();
    config.source.base_url = server.uri();
    config.download.max_concurrent_requests = max_concurrent_requests;
    config.download.timeout = Duration::from_secs(5);
    config.retry.max_retries = max_retries;
    config.retry.retry_delay = Duration::from_millis(20);
    config
}

/// HTTP downloader aimed at `server`
pub fn mock_downloader(server: &MockServer, max_concurrent_requests: usize, max_retries: u32) -> BibleDownloader {
    BibleDownloader::new(mock_config(server, max_concurrent_requests, max_retries))
        .expect("mock config should be valid")
}

/// Downloader for the real site, polite enough for repeated test runs
pub fn live_downloader() -> BibleDownloader {
    let mut config = Config::default();
    config.download.max_concurrent_requests = 2;
    config.retry.max_retries = 3;
    config.retry.retry_delay = Duration::from_secs(2);
    BibleDownloader::new(config).expect("default config should be valid")
}

/// Install a test subscriber once; `RUST_LOG` controls verbosity
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("scripture_dl=debug")),
        )
        .with_test_writer()
        .try_init();
}
