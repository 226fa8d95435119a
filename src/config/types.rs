use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the queue event log (Asterisk queue_log or equivalent).
    pub path: PathBuf,
    #[serde(default)]
    pub timestamp: TimestampConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampConfig {
    /// `epoch` or a chrono strptime format string.
    #[serde(default = "default_timestamp_format")]
    pub format: String,
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            format: default_timestamp_format(),
        }
    }
}

fn default_timestamp_format() -> String {
    "epoch".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Bound on cached scopes; least-recently-used entries are evicted past
    /// it.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// How often the background scheduler recomputes the default scope.
    #[serde(with = "humantime_serde", default = "default_refresh_interval")]
    pub interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: default_refresh_interval(),
        }
    }
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(3600)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Wall-clock bound on a single recomputation before it fails as
    /// retryable.
    #[serde(with = "humantime_serde", default = "default_compute_budget")]
    pub compute_budget: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            compute_budget: default_compute_budget(),
        }
    }
}

fn default_compute_budget() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8475".to_string()
}
