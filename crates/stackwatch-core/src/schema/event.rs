//! Events produced by a diff, and the flat records handed to sinks

use super::resource_event::ResourceEvent;
use super::stack_event::StackEvent;
use serde::Serialize;
use serde_json::{Map, Value};

/// One flat record as delivered to a downstream sink
pub type EventRecord = Map<String, Value>;

/// A single new event detected between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Event {
    /// Synthesized stack status transition
    Stack(StackEvent),
    /// Upstream resource event not present in the previous snapshot
    Resource(ResourceEvent),
}

impl Event {
    pub fn as_stack(&self) -> Option<&StackEvent> {
        match self {
            Event::Stack(event) => Some(event),
            Event::Resource(_) => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceEvent> {
        match self {
            Event::Resource(event) => Some(event),
            Event::Stack(_) => None,
        }
    }

    /// Flatten into the record shape sinks accept
    pub fn to_record(&self) -> EventRecord {
        match self {
            Event::Stack(event) => event.to_record(),
            Event::Resource(event) => event.fields().clone(),
        }
    }
}

impl From<StackEvent> for Event {
    fn from(event: StackEvent) -> Self {
        Event::Stack(event)
    }
}

impl From<ResourceEvent> for Event {
    fn from(event: ResourceEvent) -> Self {
        Event::Resource(event)
    }
}
