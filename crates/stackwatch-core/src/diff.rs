//! Snapshot diffing
//!
//! Compares the previous seed with a fresh snapshot and returns the events
//! that are new, in a fixed order:
//!
//! 1. One [`StackEvent`] per stack whose status changed, walking the union
//!    of stack ids (previous ids first, then ids only present now)
//! 2. Every [`ResourceEvent`] not already present in the previous snapshot
//!    for the same stack, walking the current snapshot's order
//!
//! The stack-level block always precedes the resource-level block.
//!
//! Resource events are matched by whole-record equality. If the upstream
//! API rewrites any field of an event it already reported (a refreshed
//! timestamp, say) the rewritten record is reported again as a new event.

use crate::schema::{Event, ResourceEvent, Snapshot, StackEvent, DELETE_COMPLETE};
use chrono::Utc;
use uuid::Uuid;

/// Diff two snapshots, stamping stack events with the current time
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<Event> {
    diff_at(previous, current, &Utc::now().to_rfc3339())
}

/// Diff two snapshots, stamping stack events with `timestamp`
pub fn diff_at(previous: &Snapshot, current: &Snapshot, timestamp: &str) -> Vec<Event> {
    let mut events: Vec<Event> = stack_changes(previous, current, timestamp)
        .into_iter()
        .map(Event::Stack)
        .collect();
    events.extend(new_resource_events(previous, current).map(Event::Resource));
    events
}

/// Stack ids of both snapshots: previous order first, then newcomers
fn union_ids<'a>(previous: &'a Snapshot, current: &'a Snapshot) -> impl Iterator<Item = &'a str> {
    previous
        .ids()
        .chain(current.ids().filter(move |id| !previous.contains(id)))
}

fn stack_changes(previous: &Snapshot, current: &Snapshot, timestamp: &str) -> Vec<StackEvent> {
    union_ids(previous, current)
        .filter_map(|stack_id| {
            let before = previous.get(stack_id);
            let after = current.get(stack_id);

            // An absent stack compares unequal to any real status
            if before.map(|s| &s.status) == after.map(|s| &s.status) {
                return None;
            }

            let (name, status) = match (after, before) {
                (Some(now), _) => (now.name.as_str(), now.status.as_str()),
                (None, Some(then)) => (then.name.as_str(), DELETE_COMPLETE),
                (None, None) => return None,
            };

            Some(StackEvent::new(
                stack_id,
                name,
                status,
                Uuid::new_v4().to_string(),
                timestamp,
            ))
        })
        .collect()
}

fn new_resource_events<'a>(
    previous: &'a Snapshot,
    current: &'a Snapshot,
) -> impl Iterator<Item = ResourceEvent> + 'a {
    current.iter().flat_map(move |(stack_id, state)| {
        let seen: &[ResourceEvent] = previous
            .get(stack_id)
            .map(|s| s.events.as_slice())
            .unwrap_or_default();
        state
            .events
            .iter()
            .filter(move |event| !seen.contains(event))
            .cloned()
    })
}
