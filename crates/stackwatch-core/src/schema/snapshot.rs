//! Point-in-time view of every stack visible to one credential set

use super::resource_event::ResourceEvent;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// State of a single stack within a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackState {
    /// Current lifecycle status (e.g. `CREATE_COMPLETE`)
    pub status: String,
    /// Human-readable stack name
    pub name: String,
    /// Full ordered list of resource events, oldest first
    #[serde(default)]
    pub events: Vec<ResourceEvent>,
}

impl StackState {
    pub fn new(status: impl Into<String>, name: impl Into<String>, events: Vec<ResourceEvent>) -> Self {
        Self {
            status: status.into(),
            name: name.into(),
            events,
        }
    }
}

/// Mapping of stack id to [`StackState`], preserving insertion order.
///
/// Iteration order matters to the diff: it decides the order in which
/// events are emitted. Serialized as a JSON object whose keys appear in
/// the same order, so a snapshot read back from disk iterates exactly like
/// the one that was written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    order: Vec<String>,
    stacks: HashMap<String, StackState>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a stack. Replacing keeps the original position.
    pub fn insert(&mut self, stack_id: impl Into<String>, state: StackState) -> Option<StackState> {
        let stack_id = stack_id.into();
        let previous = self.stacks.insert(stack_id.clone(), state);
        if previous.is_none() {
            self.order.push(stack_id);
        }
        previous
    }

    pub fn get(&self, stack_id: &str) -> Option<&StackState> {
        self.stacks.get(stack_id)
    }

    pub fn contains(&self, stack_id: &str) -> bool {
        self.stacks.contains_key(stack_id)
    }

    /// Stack ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// `(stack_id, state)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StackState)> {
        self.order
            .iter()
            .filter_map(|id| self.stacks.get(id).map(|state| (id.as_str(), state)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, StackState)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, StackState)>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for (id, state) in iter {
            snapshot.insert(id, state);
        }
        snapshot
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (id, state) in self.iter() {
            map.serialize_entry(id, state)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = Snapshot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of stack id to stack state")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Snapshot, A::Error> {
                let mut snapshot = Snapshot::new();
                while let Some((id, state)) = access.next_entry::<String, StackState>()? {
                    snapshot.insert(id, state);
                }
                Ok(snapshot)
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(status: &str, name: &str) -> StackState {
        StackState::new(status, name, Vec::new())
    }

    #[test]
    fn test_iteration_follows_insertion_order() {
        let snapshot: Snapshot = [
            ("stack-c", state("CREATE_COMPLETE", "c")),
            ("stack-a", state("CREATE_COMPLETE", "a")),
            ("stack-b", state("UPDATE_COMPLETE", "b")),
        ]
        .into_iter()
        .collect();

        let ids: Vec<&str> = snapshot.ids().collect();
        assert_eq!(ids, vec!["stack-c", "stack-a", "stack-b"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("one", state("CREATE_IN_PROGRESS", "one"));
        snapshot.insert("two", state("CREATE_COMPLETE", "two"));
        let old = snapshot.insert("one", state("CREATE_COMPLETE", "one"));

        assert_eq!(old.map(|s| s.status), Some("CREATE_IN_PROGRESS".to_string()));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.ids().next(), Some("one"));
        assert_eq!(snapshot.get("one").unwrap().status, "CREATE_COMPLETE");
    }

    #[test]
    fn test_json_keeps_key_order() {
        let snapshot: Snapshot = [
            ("zeta", state("CREATE_COMPLETE", "z")),
            ("alpha", state("CREATE_COMPLETE", "a")),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.find("zeta").unwrap() < json.find("alpha").unwrap());

        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(back.ids().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_missing_events_defaults_to_empty() {
        let back: Snapshot =
            serde_json::from_str(r#"{"s1":{"status":"CREATE_COMPLETE","name":"web"}}"#).unwrap();
        assert!(back.get("s1").unwrap().events.is_empty());
    }

    #[test]
    fn test_rejects_non_map() {
        let result: Result<Snapshot, _> = serde_json::from_str("[1, 2, 3]");
        assert!(result.is_err());
    }
}
