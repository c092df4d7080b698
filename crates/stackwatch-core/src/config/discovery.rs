//! Configuration discovery and resolution

use super::types::{Config, DaemonConfig, TargetConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable overriding the default cache directory
pub const ENV_CACHE_DIR: &str = "STACKWATCH_CACHE_DIR";
/// Environment variable overriding the default poll interval (seconds)
pub const ENV_INTERVAL: &str = "STACKWATCH_INTERVAL";

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("TOML parsing error in {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Semantically invalid value
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// Command-line overrides for configuration
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Explicit config file; must exist and parse
    pub config_path: Option<PathBuf>,
    /// Override default cache directory
    pub cache_directory: Option<PathBuf>,
    /// Override default poll interval
    pub interval_secs: Option<u64>,
}

/// On-disk shape: distinguishes an absent [daemon] table from a default one
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    daemon: Option<DaemonConfig>,
    #[serde(default)]
    targets: Vec<TargetConfig>,
}

/// Resolve configuration from all sources
///
/// Priority (highest to lowest):
/// 1. Command-line overrides
/// 2. Environment variables
/// 3. Repo-local config (.stackwatch.toml in current dir or up to git root)
/// 4. Global config (~/.config/stackwatch/config.toml)
/// 5. Defaults
///
/// With an explicit `config_path`, steps 3 and 4 are skipped and a file
/// that cannot be read or parsed is an error.
pub fn resolve_config(
    overrides: &ConfigOverrides,
    current_dir: &Path,
    home_dir: &Path,
) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    if let Some(path) = &overrides.config_path {
        merge_config(&mut config, load_config_file(path)?);
    } else {
        // 4. Try global config
        let global_config_path = home_dir.join(".config/stackwatch/config.toml");
        if global_config_path.exists() {
            match load_config_file(&global_config_path) {
                Ok(file_config) => merge_config(&mut config, file_config),
                Err(e) => warn!("Failed to parse global config: {e}"),
            }
        }

        // 3. Try repo-local config (current dir or git root)
        if let Some(repo_config) = find_repo_local_config(current_dir) {
            match load_config_file(&repo_config) {
                Ok(file_config) => merge_config(&mut config, file_config),
                Err(e) => warn!("Failed to parse repo config: {e}"),
            }
        }
    }

    // 2. Apply environment variables
    apply_env_overrides(&mut config);

    // 1. Apply command-line overrides
    apply_cli_overrides(&mut config, overrides);

    if config.daemon.interval_secs == 0 {
        return Err(ConfigError::Invalid {
            message: "daemon.interval_secs must be greater than zero".to_string(),
        });
    }

    Ok(config)
}

/// Find repo-local config file
///
/// Searches current directory and parent directories up to git root
fn find_repo_local_config(current_dir: &Path) -> Option<PathBuf> {
    let mut dir = current_dir;

    loop {
        let config_path = dir.join(".stackwatch.toml");
        if config_path.exists() {
            return Some(config_path);
        }

        // Stop at git root
        if dir.join(".git").exists() {
            break;
        }

        dir = dir.parent()?;
    }

    None
}

/// Load config from a TOML file
fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded config from {}", path.display());
    Ok(file)
}

/// Merge file config into base config
///
/// A [daemon] table replaces the current one; a non-empty target list
/// replaces the current list.
fn merge_config(base: &mut Config, file: ConfigFile) {
    if let Some(daemon) = file.daemon {
        base.daemon = daemon;
    }
    if !file.targets.is_empty() {
        base.targets = file.targets;
    }
}

/// Apply environment variable overrides
fn apply_env_overrides(config: &mut Config) {
    if let Ok(dir) = std::env::var(ENV_CACHE_DIR)
        && !dir.is_empty()
    {
        config.daemon.cache_directory = Some(PathBuf::from(dir));
    }

    if let Ok(interval) = std::env::var(ENV_INTERVAL) {
        match interval.parse::<u64>() {
            Ok(secs) => config.daemon.interval_secs = secs,
            Err(_) => warn!("Ignoring non-numeric {ENV_INTERVAL}={interval}"),
        }
    }
}

/// Apply command-line overrides
fn apply_cli_overrides(config: &mut Config, overrides: &ConfigOverrides) {
    if let Some(dir) = &overrides.cache_directory {
        config.daemon.cache_directory = Some(dir.clone());
    }
    if let Some(secs) = overrides.interval_secs {
        config.daemon.interval_secs = secs;
    }
}
