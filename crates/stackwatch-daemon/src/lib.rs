//! stackwatch daemon
//!
//! Keeps one [`Poller`](poller::Poller) per configured target. Each poller
//! periodically fetches the stacks visible to its credentials, diffs them
//! against its persisted seed, and sends the new events to a named sink.
//! The [`Supervisor`](supervisor::Supervisor) rebuilds pollers that die.
//!
//! ```text
//!   Supervisor ── build ──► Poller #1 ──► fetch ► diff ► send ► persist
//!       ▲                   Poller #2 ──► ...
//!       │                   Poller #N ──► ...
//!       └──── termination channel (slot rebuilt in place) ◄──┘
//! ```

pub mod poller;
pub mod provider;
pub mod shutdown;
pub mod sink;
pub mod supervisor;

pub use poller::{
    CycleOutcome, Poller, PollerContext, PollerError, PollerHandle, PollerId, PollerSettings,
    PollerStatus, StopOutcome, Termination,
};
pub use supervisor::Supervisor;
