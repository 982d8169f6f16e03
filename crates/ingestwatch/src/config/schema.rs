use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::store::DEFAULT_HISTORY_LIMIT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    /// Delay between two status requests for the active job.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Number of finished jobs kept in the history.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Location of the state database. Defaults to
    /// `~/.ingestwatch/data/ingestwatch.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Resolved database location, if one can be determined.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(default_database_path)
    }
}

/// `~/.ingestwatch/data/ingestwatch.db`, if a home directory is known.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ingestwatch").join("data").join("ingestwatch.db"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            poll_interval_ms: default_poll_interval_ms(),
            history_limit: default_history_limit(),
            database_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
