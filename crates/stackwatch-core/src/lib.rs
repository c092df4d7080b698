//! Core types and algorithms for stackwatch
//!
//! This crate holds the synchronous building blocks used by the polling
//! daemon:
//!
//! - **Schema**: snapshots of remote stacks, resource events, and the
//!   synthetic stack events emitted on status changes
//! - **Diff**: turns two snapshots into an ordered list of new events
//! - **Seed store**: persists one snapshot per target under a cache key
//! - **Config**: target definitions and file/env configuration resolution
//!
//! Nothing in here spawns tasks or touches the network.

pub mod config;
pub mod diff;
pub mod io;
pub mod logging;
pub mod schema;

pub use config::{Credentials, Target, TargetConfig, TargetError};
pub use diff::diff;
pub use io::{cache_key, SeedError};
pub use schema::{Event, EventRecord, ResourceEvent, Snapshot, StackEvent, StackState};
