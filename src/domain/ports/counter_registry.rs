//! Counter Registry Port
//!
//! Defines the interface for named monotonic counters shared between the
//! forwarding store (sole writer) and monitoring readers.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lifetime total of entries acknowledged by the collector.
pub const SENT: &str = "sent";
/// Entries acknowledged since the last threshold-triggered reconnect.
pub const SENT_SINCE_RECONNECT: &str = "sent_since_reconnect";
/// Threshold-triggered reconnect cycles, whether or not the reopen succeeded.
pub const RECONNECTS: &str = "reconnects";
/// Failed attempts to open a connection.
pub const CONNECT_FAILURES: &str = "connect_failures";
/// Failed batch sends.
pub const SEND_FAILURES: &str = "send_failures";

/// Name of the per-category sent counter.
pub fn category_sent(category: &str) -> String {
    format!("{}:sent", category)
}

/// Store for named 64-bit counters.
///
/// All operations are infallible and safe under concurrent callers.
/// Reading a counter that was never written yields 0.
pub trait CounterRegistry: Send + Sync {
    /// Add `delta` to a counter, creating it at 0 first if absent.
    fn increment(&self, name: &str, delta: u64);

    /// Apply several increments as one step with respect to `snapshot`.
    ///
    /// A snapshot observes either all of them or none of them.
    fn increment_many(&self, deltas: &[(&str, u64)]);

    /// Set a counter to 0.
    fn reset(&self, name: &str);

    /// Current value of a counter.
    fn get(&self, name: &str) -> u64;

    /// Point-in-time copy of every counter.
    fn snapshot(&self) -> CounterSnapshot;
}

/// Immutable copy of all counter values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CounterSnapshot {
    values: BTreeMap<String, u64>,
}

impl CounterSnapshot {
    pub fn new(values: BTreeMap<String, u64>) -> Self {
        Self { values }
    }

    /// Value of `name`, or 0 when absent.
    pub fn get(&self, name: &str) -> u64 {
        self.values.get(name).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Read-only view of a counter registry for monitoring collaborators.
#[derive(Clone)]
pub struct CounterReader {
    registry: Arc<dyn CounterRegistry>,
}

impl CounterReader {
    pub fn new(registry: Arc<dyn CounterRegistry>) -> Self {
        Self { registry }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.registry.get(name)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        self.registry.snapshot()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_missing_is_zero() {
        let snap = CounterSnapshot::default();
        assert_eq!(snap.get(SENT), 0);
        assert!(snap.is_empty());
    }

    #[test]
    fn test_snapshot_serializes_as_map() {
        let mut values = BTreeMap::new();
        values.insert(SENT.to_string(), 7);
        values.insert(SENT_SINCE_RECONNECT.to_string(), 1);
        let snap = CounterSnapshot::new(values);

        let json = serde_json::to_string(&snap).unwrap();
        assert_eq!(json, r#"{"sent":7,"sent_since_reconnect":1}"#);
    }

    #[test]
    fn test_category_sent_name() {
        assert_eq!(category_sent("TestReconnection"), "TestReconnection:sent");
    }
}
