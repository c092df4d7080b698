//! Name → sink map shared between pollers and whoever owns the sinks

use super::{Sink, SinkResolver};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Thread-safe registry of named sinks.
///
/// Registering a name that is already taken replaces the old sink.
#[derive(Debug, Default)]
pub struct SinkRegistry {
    sinks: RwLock<HashMap<String, Arc<dyn Sink>>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sink` under `name`, returning the sink it replaced
    pub fn register(&self, name: impl Into<String>, sink: Arc<dyn Sink>) -> Option<Arc<dyn Sink>> {
        let name = name.into();
        debug!("Registering sink '{}'", name);
        self.sinks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name, sink)
    }

    pub fn deregister(&self, name: &str) -> Option<Arc<dyn Sink>> {
        debug!("Deregistering sink '{}'", name);
        self.sinks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .sinks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort_unstable();
        names
    }
}

impl SinkResolver for SinkRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Sink>> {
        self.sinks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ChannelSink;
    use serde_json::json;

    fn record(n: i64) -> stackwatch_core::EventRecord {
        let mut map = stackwatch_core::EventRecord::new();
        map.insert("n".to_string(), json!(n));
        map
    }

    #[test]
    fn test_resolve_unknown_is_none() {
        let registry = SinkRegistry::new();
        assert!(registry.resolve("nowhere").is_none());
    }

    #[test]
    fn test_reregister_replaces_sink() {
        let registry = SinkRegistry::new();
        let (first, mut first_rx) = ChannelSink::new();
        let (second, mut second_rx) = ChannelSink::new();

        registry.register("events", Arc::new(first));
        registry.resolve("events").unwrap().transmit(record(1));

        assert!(registry.register("events", Arc::new(second)).is_some());
        registry.resolve("events").unwrap().transmit(record(2));

        assert_eq!(first_rx.try_recv().unwrap(), record(1));
        assert!(first_rx.try_recv().is_err());
        assert_eq!(second_rx.try_recv().unwrap(), record(2));
        assert_eq!(registry.names(), vec!["events".to_string()]);
    }

    #[test]
    fn test_deregister() {
        let registry = SinkRegistry::new();
        let (sink, _rx) = ChannelSink::new();
        registry.register("events", Arc::new(sink));
        assert!(registry.deregister("events").is_some());
        assert!(registry.resolve("events").is_none());
        assert!(registry.deregister("events").is_none());
    }
}
