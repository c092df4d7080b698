//! Configuration resolution
//!
//! Resolves configuration from multiple sources with priority:
//! 1. Command-line flags (passed as parameters)
//! 2. Environment variables
//! 3. Repo-local config (.stackwatch.toml)
//! 4. Global config (~/.config/stackwatch/config.toml)
//! 5. Defaults

mod discovery;
mod target;
mod types;

pub use discovery::{resolve_config, ConfigError, ConfigOverrides};
pub use target::{Target, TargetError};
pub use types::{Config, Credentials, DaemonConfig, TargetConfig};
