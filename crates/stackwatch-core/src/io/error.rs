//! Error types for seed persistence

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or saving a seed.
///
/// A missing cache file is not an error; see [`load_seed`](super::load_seed).
#[derive(Error, Debug)]
pub enum SeedError {
    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The cache file exists but does not hold a valid snapshot
    #[error("corrupt seed file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Snapshot could not be encoded
    #[error("failed to encode seed: {source}")]
    Encode { source: serde_json::Error },
}

impl SeedError {
    /// True if the file was present but unreadable as a snapshot
    pub fn is_corrupt(&self) -> bool {
        matches!(self, SeedError::Corrupt { .. })
    }
}
