//! Schema types for stack snapshots and the events derived from them
//!
//! A [`Snapshot`] is what one credential set can see at one point in time.
//! [`ResourceEvent`]s are passed through from the upstream API untouched;
//! [`StackEvent`]s are synthesized when a stack's status changes.

pub mod event;
pub mod resource_event;
pub mod snapshot;
pub mod stack_event;

pub use event::{Event, EventRecord};
pub use resource_event::ResourceEvent;
pub use snapshot::{Snapshot, StackState};
pub use stack_event::{StackEvent, DELETE_COMPLETE, STACK_RESOURCE_TYPE};
