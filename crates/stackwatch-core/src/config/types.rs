//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque credential set for one remote target.
///
/// Passed to the API connector untouched; also the input of the target's
/// cache key.
pub type Credentials = toml::Table;

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Daemon-wide settings and per-target defaults
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// One entry per independently polled credential set: [[targets]]
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

/// Daemon-wide configuration: [daemon]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Destination name under which the supervisor accepts records
    pub name: String,
    /// Default seconds between polls for targets that do not set one
    pub interval_secs: u64,
    /// Default cache directory (None = system temp directory)
    pub cache_directory: Option<PathBuf>,
    /// Cooldown after a failed poll cycle
    pub recovery_delay_secs: u64,
    /// Per-poller wait during graceful shutdown
    pub shutdown_timeout_secs: u64,
}

impl DaemonConfig {
    pub const DEFAULT_INTERVAL_SECS: u64 = 30;
    pub const DEFAULT_RECOVERY_DELAY_SECS: u64 = 10;
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            name: "stackwatch".to_string(),
            interval_secs: Self::DEFAULT_INTERVAL_SECS,
            cache_directory: None,
            recovery_delay_secs: Self::DEFAULT_RECOVERY_DELAY_SECS,
            shutdown_timeout_secs: 5,
        }
    }
}

/// A single polled target as written in config: [[targets]]
///
/// Required fields are optional here so that a missing one is reported
/// when a poller is built, not as a generic parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Credential set for the remote API (required)
    #[serde(default)]
    pub credentials: Option<Credentials>,
    /// Name of the sink that receives this target's events (required)
    #[serde(default)]
    pub destination: Option<String>,
    /// Seconds between polls (default 30)
    #[serde(default)]
    pub interval_secs: Option<u64>,
    /// Directory holding the seed file (default system temp directory)
    #[serde(default)]
    pub cache_directory: Option<PathBuf>,
    /// Start polling as soon as the poller is built (default true)
    #[serde(default)]
    pub auto_start: Option<bool>,
}

impl TargetConfig {
    /// Create a target config with the two required fields set
    pub fn new(credentials: Credentials, destination: impl Into<String>) -> Self {
        Self {
            credentials: Some(credentials),
            destination: Some(destination.into()),
            ..Default::default()
        }
    }

    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = Some(secs);
        self
    }

    pub fn with_cache_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_directory = Some(dir.into());
        self
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = Some(auto_start);
        self
    }
}

impl Config {
    /// Targets with unset interval/cache directory filled from [daemon]
    pub fn targets_with_defaults(&self) -> Vec<TargetConfig> {
        self.targets
            .iter()
            .cloned()
            .map(|mut target| {
                if target.interval_secs.is_none() {
                    target.interval_secs = Some(self.daemon.interval_secs);
                }
                if target.cache_directory.is_none() {
                    target.cache_directory = self.daemon.cache_directory.clone();
                }
                target
            })
            .collect()
    }
}
