//! Configuration types for jobfeed

use crate::error::{Error, Result};
use crate::types::Dialect;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Top-level configuration
///
/// Every field has a sensible default; an empty `Config::default()` produces a
/// working importer with no sources and no schedule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite database file (default: "jobfeed.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Source feeds to import
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Worker pool behavior
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Feed fetching behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Task broker behavior (backoff, retention)
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Statistics behavior
    #[serde(default)]
    pub stats: StatsConfig,

    /// Interval between scheduled imports of all sources (None = manual triggers only)
    #[serde(default, with = "optional_duration_serde")]
    pub schedule_interval: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            sources: Vec::new(),
            worker: WorkerConfig::default(),
            fetch: FetchConfig::default(),
            broker: BrokerConfig::default(),
            stats: StatsConfig::default(),
            schedule_interval: None,
        }
    }
}

impl Config {
    /// Validate the configuration, returning the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.worker.concurrency == 0 {
            return Err(Error::Config {
                message: "worker concurrency must be at least 1".into(),
                key: Some("worker.concurrency".into()),
            });
        }
        if self.worker.batch_size == 0 {
            return Err(Error::Config {
                message: "batch size must be at least 1".into(),
                key: Some("worker.batch_size".into()),
            });
        }
        for source in &self.sources {
            url::Url::parse(&source.url).map_err(|e| Error::Config {
                message: format!("invalid source URL '{}': {}", source.url, e),
                key: Some("sources.url".into()),
            })?;
            if source.batch_size == Some(0) {
                return Err(Error::Config {
                    message: format!("batch size override for '{}' must be at least 1", source.url),
                    key: Some("sources.batch_size".into()),
                });
            }
        }
        Ok(())
    }

    /// Look up the configured source entry for a URL, if any
    pub fn source(&self, url: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.url == url)
    }
}

/// Static per-feed metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Feed URL
    pub url: String,

    /// Format hint; auto-detected when absent
    #[serde(default)]
    pub dialect: Option<Dialect>,

    /// Per-source override of the upsert batch size
    #[serde(default)]
    pub batch_size: Option<usize>,
}

impl SourceConfig {
    /// Create a source entry with auto-detected dialect and default batch size
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            dialect: None,
            batch_size: None,
        }
    }
}

/// Worker pool configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of concurrent workers (default: 5)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Records per upsert batch (default: 50)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Global per-run timeout; an over-long run is failed and logged (default: 5 minutes)
    #[serde(default = "default_run_timeout", with = "duration_serde")]
    pub run_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            batch_size: default_batch_size(),
            run_timeout: default_run_timeout(),
        }
    }
}

/// Feed fetching configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with feed requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Transient-failure retry behavior within a run
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
        }
    }
}

/// In-run retry configuration for transient fetch failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial try (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 500 ms)
    #[serde(default = "default_initial_delay", with = "duration_millis_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_retry_delay", with = "duration_millis_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_retry_delay(),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Task broker configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Maximum task retry attempts before a task is terminally failed (default: 3)
    #[serde(default = "default_broker_max_attempts")]
    pub max_attempts: i32,

    /// Base delay for task backoff; attempt n waits `base * 2^n` (default: 1 second)
    #[serde(default = "default_backoff_base", with = "duration_serde")]
    pub backoff_base: Duration,

    /// Completed tasks retained before pruning, oldest first (default: 1000)
    #[serde(default = "default_completed_retention")]
    pub completed_retention: u64,

    /// Terminally failed tasks retained for inspection before pruning (default: 200)
    #[serde(default = "default_failed_retention")]
    pub failed_retention: u64,

    /// How long idle workers sleep between dequeue attempts (default: 100 ms)
    #[serde(default = "default_poll_interval", with = "duration_millis_serde")]
    pub poll_interval: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_broker_max_attempts(),
            backoff_base: default_backoff_base(),
            completed_retention: default_completed_retention(),
            failed_retention: default_failed_retention(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// Statistics configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Window for the "recent imports" overview counter (default: 24 hours)
    #[serde(default = "default_recent_window", with = "duration_serde")]
    pub recent_window: Duration,

    /// Days of history covered by trend buckets (default: 7)
    #[serde(default = "default_trend_days")]
    pub trend_days: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            recent_window: default_recent_window(),
            trend_days: default_trend_days(),
        }
    }
}

// Default value functions
fn default_database_path() -> PathBuf {
    PathBuf::from("jobfeed.db")
}

fn default_concurrency() -> usize {
    5
}

fn default_batch_size() -> usize {
    50
}

fn default_run_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("jobfeed/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_retry_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_broker_max_attempts() -> i32 {
    3
}

fn default_backoff_base() -> Duration {
    Duration::from_secs(1)
}

fn default_completed_retention() -> u64 {
    1000
}

fn default_failed_retention() -> u64 {
    200
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_recent_window() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_trend_days() -> u32 {
    7
}

fn default_true() -> bool {
    true
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

// Duration serialization helper (milliseconds, for sub-second settings)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Optional Duration serialization helper (whole seconds)
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.worker.concurrency, 5);
        assert_eq!(config.worker.batch_size, 50);
        assert_eq!(config.broker.max_attempts, 3);
        assert_eq!(config.broker.backoff_base, Duration::from_secs(1));
        assert_eq!(config.fetch.retry.max_attempts, 2);
        assert_eq!(config.stats.recent_window, Duration::from_secs(86400));
        assert!(config.schedule_interval.is_none());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut config = Config::default();
        config.worker.concurrency = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn invalid_source_url_is_rejected() {
        let mut config = Config::default();
        config.sources.push(SourceConfig::new("not a url"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_batch_size_override_is_rejected() {
        let mut config = Config::default();
        config.sources.push(SourceConfig {
            url: "https://jobs.example.com/feed.xml".into(),
            dialect: None,
            batch_size: Some(0),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let mut config = Config::default();
        config.sources.push(SourceConfig {
            url: "https://jobs.example.com/feed.xml".into(),
            dialect: Some(Dialect::Rss2),
            batch_size: Some(25),
        });
        config.schedule_interval = Some(Duration::from_secs(900));

        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(back.sources.len(), 1);
        assert_eq!(back.sources[0].dialect, Some(Dialect::Rss2));
        assert_eq!(back.schedule_interval, Some(Duration::from_secs(900)));
    }

    #[test]
    fn source_lookup_finds_configured_entry() {
        let mut config = Config::default();
        config
            .sources
            .push(SourceConfig::new("https://jobs.example.com/feed.xml"));

        assert!(config.source("https://jobs.example.com/feed.xml").is_some());
        assert!(config.source("https://other.example.com/feed.xml").is_none());
    }
}
