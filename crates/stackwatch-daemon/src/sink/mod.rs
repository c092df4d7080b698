//! Downstream sinks
//!
//! Pollers hand each event record to a [`Sink`] looked up by destination
//! name through a [`SinkResolver`]. The lookup happens for every record, so
//! a destination that is deregistered and registered again is picked up
//! without touching the poller.

mod channel;
mod json_lines;
mod registry;

pub use channel::ChannelSink;
pub use json_lines::JsonLinesSink;
pub use registry::SinkRegistry;

use stackwatch_core::EventRecord;
use std::sync::Arc;

/// Receiver of event records.
///
/// Fire-and-forget: no acknowledgment, retry, or backpressure.
pub trait Sink: Send + Sync + std::fmt::Debug {
    fn transmit(&self, record: EventRecord);
}

/// Looks up sinks by destination name
pub trait SinkResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Sink>>;
}
