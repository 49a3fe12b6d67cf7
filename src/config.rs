//! Configuration types for scripture-dl

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Download behavior configuration (concurrency, per-attempt timeout)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Maximum simultaneous chapter fetches across a whole job (default: 5)
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Hard upper bound on one fetch attempt (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Translation used when a caller does not name one (default: "NIV")
    #[serde(default = "default_translation")]
    pub default_translation: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            timeout: default_timeout(),
            default_translation: default_translation(),
        }
    }
}

/// Retry behavior for transient chapter failures
///
/// Backoff is linear: the wait before retry `n` is `retry_delay * n`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (default: 3). Zero means a single attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay (default: 1 second)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

impl RetryConfig {
    /// Backoff before the given retry (1-based).
    ///
    /// `attempt` is the number of the attempt that just failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt)
    }
}

/// Where chapter pages come from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Site root, without trailing slash (default: "https://www.biblegateway.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

/// Top-level configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Concurrency and timeout settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Retry settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Remote source settings
    #[serde(default)]
    pub source: SourceConfig,
}

impl Config {
    /// Check that every setting is usable before any work is dispatched
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_requests == 0 {
            return Err(Error::config(
                "max_concurrent_requests",
                "max_concurrent_requests must be at least 1",
            ));
        }
        if self.download.timeout.is_zero() {
            return Err(Error::config("timeout", "timeout must be positive"));
        }
        if self.download.default_translation.trim().is_empty() {
            return Err(Error::config(
                "default_translation",
                "default_translation must not be empty",
            ));
        }
        if url::Url::parse(&self.source.base_url).is_err() {
            return Err(Error::config(
                "base_url",
                format!("invalid base_url: {}", self.source.base_url),
            ));
        }
        Ok(())
    }

    /// Parse a JSON configuration document, filling omitted fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json).map_err(|e| Error::Config {
            message: format!("invalid configuration JSON: {e}"),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }
}

fn default_max_concurrent_requests() -> usize {
    5
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_translation() -> String {
    "NIV".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_base_url() -> String {
    "https://www.biblegateway.com".to_string()
}

fn default_user_agent() -> String {
    concat!("scripture-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
