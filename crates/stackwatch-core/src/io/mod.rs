//! On-disk state for pollers
//!
//! Each target owns one cache file named after its [`cache_key`]. The file
//! holds the last successfully processed [`Snapshot`](crate::Snapshot), the
//! baseline the next poll is diffed against.
//!
//! - **Cache key**: SHA-256 over the target's credentials, independent of
//!   entry order
//! - **Seed store**: full-overwrite JSON writes, and reads that tell a
//!   missing file apart from a corrupt one

pub mod error;
pub mod hash;
pub mod seed;

pub use error::SeedError;
pub use hash::cache_key;
pub use seed::{load_seed, save_seed};
