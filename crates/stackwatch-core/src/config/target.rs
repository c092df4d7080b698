//! Validated, immutable target definitions

use super::types::{Credentials, DaemonConfig, TargetConfig};
use crate::io::cache_key;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// A target entry that cannot be turned into a poller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("`credentials` are required for API connection")]
    MissingCredentials,

    #[error("`destination` is required for event distribution")]
    MissingDestination,

    #[error("`interval_secs` must be greater than zero")]
    ZeroInterval,
}

/// A target ready to be polled.
///
/// Built once from a [`TargetConfig`]; every poller rebuilt for the same
/// slot is built from the same `Target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    credentials: Credentials,
    destination: String,
    interval: Duration,
    cache_directory: PathBuf,
    auto_start: bool,
    cache_key: String,
}

impl Target {
    /// Validate a config entry and apply defaults.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] if `credentials` or `destination` is absent,
    /// or if the interval is zero. A blank destination counts as absent.
    pub fn from_config(config: &TargetConfig) -> Result<Self, TargetError> {
        let credentials = config
            .credentials
            .clone()
            .ok_or(TargetError::MissingCredentials)?;

        let destination = config
            .destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or(TargetError::MissingDestination)?
            .to_string();

        let interval_secs = config
            .interval_secs
            .unwrap_or(DaemonConfig::DEFAULT_INTERVAL_SECS);
        if interval_secs == 0 {
            return Err(TargetError::ZeroInterval);
        }
        let interval = Duration::from_secs(interval_secs);

        let cache_directory = config
            .cache_directory
            .clone()
            .unwrap_or_else(std::env::temp_dir);

        Ok(Self {
            cache_key: cache_key(&credentials),
            credentials,
            destination,
            interval,
            cache_directory,
            auto_start: config.auto_start.unwrap_or(true),
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn cache_directory(&self) -> &Path {
        &self.cache_directory
    }

    pub fn auto_start(&self) -> bool {
        self.auto_start
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// `<cache_directory>/<cache_key>`
    pub fn cache_file(&self) -> PathBuf {
        self.cache_directory.join(&self.cache_key)
    }
}
