//! Synthetic events emitted when a stack's own status changes

use super::event::EventRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resource type reported for synthesized stack-level events
pub const STACK_RESOURCE_TYPE: &str = "AWS::CloudFormation::Stack";

/// Status reported for a stack that disappeared from the listing
pub const DELETE_COMPLETE: &str = "DELETE_COMPLETE";

/// A stack-level status transition.
///
/// Shaped like an upstream resource event so downstream consumers can
/// treat both kinds uniformly: the stack is its own logical resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    pub stack_id: String,
    pub stack_name: String,
    /// Freshly generated per emission, never derived from content
    pub event_id: String,
    /// Always the stack name
    pub logical_resource_id: String,
    /// Always the stack id
    pub physical_resource_id: String,
    /// Emission time (RFC 3339)
    pub timestamp: String,
    pub resource_type: String,
    pub resource_status: String,
}

impl StackEvent {
    /// Build a stack event with the fixed field relationships filled in
    pub fn new(
        stack_id: impl Into<String>,
        stack_name: impl Into<String>,
        resource_status: impl Into<String>,
        event_id: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        let stack_id = stack_id.into();
        let stack_name = stack_name.into();
        Self {
            logical_resource_id: stack_name.clone(),
            physical_resource_id: stack_id.clone(),
            stack_id,
            stack_name,
            event_id: event_id.into(),
            timestamp: timestamp.into(),
            resource_type: STACK_RESOURCE_TYPE.to_string(),
            resource_status: resource_status.into(),
        }
    }

    /// Flatten into a downstream record
    pub fn to_record(&self) -> EventRecord {
        let mut record = EventRecord::new();
        for (key, value) in [
            ("stack_id", &self.stack_id),
            ("stack_name", &self.stack_name),
            ("event_id", &self.event_id),
            ("logical_resource_id", &self.logical_resource_id),
            ("physical_resource_id", &self.physical_resource_id),
            ("timestamp", &self.timestamp),
            ("resource_type", &self.resource_type),
            ("resource_status", &self.resource_status),
        ] {
            record.insert(key.to_string(), Value::String(value.clone()));
        }
        record
    }
}
