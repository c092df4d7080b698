//! Opaque resource event records as reported by the orchestration API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single resource state transition reported by the upstream API.
///
/// The record is kept exactly as received. Two events are the same event
/// only if every field is equal; field order does not matter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceEvent(Map<String, Value>);

impl ResourceEvent {
    /// Wrap an already-decoded record
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build a record from `(field, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Look up a single field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Borrow the underlying record
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the underlying record
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ResourceEvent {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}
