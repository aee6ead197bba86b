use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub tailer: TailerConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailerConfig {
    /// Directory holding the actively written log file
    pub scrape_path: PathBuf,
    /// Regex matched against file names (not full paths) inside `scrape_path`
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    #[serde(default)]
    pub start: ReadStart,
}

fn default_file_pattern() -> String {
    r"\.log$".to_string()
}

/// Where reading begins for the file found at startup.
///
/// Files that appear later through rotation are always read from offset 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStart {
    #[default]
    Beginning,
    End,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub push_url: String,
    /// Static label set attached to every pushed stream
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Number of push attempts per batch
    #[serde(default = "default_retry")]
    pub retry: u32,
    #[serde(with = "humantime_serde", default = "default_backoff")]
    pub backoff: Duration,
    #[serde(with = "humantime_serde", default = "default_max_backoff")]
    pub max_backoff: Duration,
    /// Flush threshold in bytes; a batch flushes once its size exceeds this
    #[serde(default = "default_batch_max_size")]
    pub batch_max_size: usize,
    #[serde(with = "humantime_serde", default = "default_batch_max_wait")]
    pub batch_max_wait: Duration,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

fn default_retry() -> u32 {
    5
}

fn default_backoff() -> Duration {
    Duration::from_secs(1)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(60)
}

fn default_batch_max_size() -> usize {
    1 << 20
}

fn default_batch_max_wait() -> Duration {
    Duration::from_secs(1)
}

fn default_queue_capacity() -> usize {
    1 << 12
}

fn default_timeout() -> Duration {
    Duration::from_secs(3)
}

impl ClientConfig {
    /// Client config with defaults for everything except the endpoint and labels.
    pub fn new(push_url: impl Into<String>, labels: BTreeMap<String, String>) -> Self {
        Self {
            push_url: push_url.into(),
            labels,
            retry: default_retry(),
            backoff: default_backoff(),
            max_backoff: default_max_backoff(),
            batch_max_size: default_batch_max_size(),
            batch_max_wait: default_batch_max_wait(),
            queue_capacity: default_queue_capacity(),
            timeout: default_timeout(),
        }
    }
}

impl TailerConfig {
    pub fn new(scrape_path: impl Into<PathBuf>, file_pattern: impl Into<String>) -> Self {
        Self {
            scrape_path: scrape_path.into(),
            file_pattern: file_pattern.into(),
            start: ReadStart::default(),
        }
    }
}
