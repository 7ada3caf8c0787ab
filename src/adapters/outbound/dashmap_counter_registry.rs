//! DashMap Counter Registry
//!
//! Implements CounterRegistry using DashMap for concurrent access.

use crate::domain::ports::{CounterRegistry, CounterSnapshot};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// DashMap-backed counter registry.
///
/// Each counter is an `AtomicU64` inside a DashMap entry. Writers take the
/// shared side of `snapshot_gate`; `snapshot()` takes the exclusive side, so a
/// snapshot never observes part of a grouped increment. Writers never block
/// each other.
pub struct DashMapCounterRegistry {
    counters: DashMap<String, AtomicU64>,
    snapshot_gate: RwLock<()>,
}

impl DashMapCounterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
            snapshot_gate: RwLock::new(()),
        }
    }

    /// Names of all counters written so far.
    pub fn names(&self) -> Vec<String> {
        self.counters.iter().map(|e| e.key().clone()).collect()
    }

    fn add(&self, name: &str, delta: u64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(delta, Ordering::Relaxed);
            return;
        }
        self.counters
            .entry(name.to_string())
            .or_default()
            .fetch_add(delta, Ordering::Relaxed);
    }
}

impl Default for DashMapCounterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterRegistry for DashMapCounterRegistry {
    fn increment(&self, name: &str, delta: u64) {
        let _gate = self.snapshot_gate.read();
        self.add(name, delta);
    }

    fn increment_many(&self, deltas: &[(&str, u64)]) {
        let _gate = self.snapshot_gate.read();
        for (name, delta) in deltas {
            self.add(name, *delta);
        }
    }

    fn reset(&self, name: &str) {
        let _gate = self.snapshot_gate.read();
        self.counters
            .entry(name.to_string())
            .or_default()
            .store(0, Ordering::Relaxed);
    }

    fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn snapshot(&self) -> CounterSnapshot {
        let _gate = self.snapshot_gate.write();
        let values: BTreeMap<String, u64> = self
            .counters
            .iter()
            .map(|e| (e.key().clone(), e.value().load(Ordering::Relaxed)))
            .collect();
        CounterSnapshot::new(values)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::ports::{SENT, SENT_SINCE_RECONNECT};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    // ===== Basic Operations =====

    #[test]
    fn test_counter_starts_at_zero() {
        let registry = DashMapCounterRegistry::new();
        assert_eq!(registry.get(SENT), 0);
    }

    #[test]
    fn test_increment() {
        let registry = DashMapCounterRegistry::new();

        registry.increment(SENT, 3);
        assert_eq!(registry.get(SENT), 3);

        registry.increment(SENT, 3);
        assert_eq!(registry.get(SENT), 6);
    }

    #[test]
    fn test_increment_by_zero_creates_counter() {
        let registry = DashMapCounterRegistry::new();
        registry.increment("idle", 0);
        assert_eq!(registry.names(), vec!["idle".to_string()]);
        assert_eq!(registry.snapshot().get("idle"), 0);
    }

    #[test]
    fn test_reset() {
        let registry = DashMapCounterRegistry::new();
        registry.increment(SENT_SINCE_RECONNECT, 6);
        registry.reset(SENT_SINCE_RECONNECT);
        assert_eq!(registry.get(SENT_SINCE_RECONNECT), 0);
    }

    #[test]
    fn test_reset_missing_counter() {
        let registry = DashMapCounterRegistry::new();
        registry.reset("nonexistent");
        assert_eq!(registry.get("nonexistent"), 0);
    }

    #[test]
    fn test_increment_many() {
        let registry = DashMapCounterRegistry::new();
        registry.increment_many(&[(SENT, 3), (SENT_SINCE_RECONNECT, 3), ("cat:sent", 3)]);

        let snap = registry.snapshot();
        assert_eq!(snap.get(SENT), 3);
        assert_eq!(snap.get(SENT_SINCE_RECONNECT), 3);
        assert_eq!(snap.get("cat:sent"), 3);
        assert_eq!(snap.len(), 3);
    }

    #[test]
    fn test_counters_isolated() {
        let registry = DashMapCounterRegistry::new();
        registry.increment("a", 1);
        registry.increment("b", 2);
        assert_eq!(registry.get("a"), 1);
        assert_eq!(registry.get("b"), 2);
        assert_eq!(registry.get("c"), 0);
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let registry = DashMapCounterRegistry::new();
        registry.increment(SENT, 7);
        registry.increment(SENT_SINCE_RECONNECT, 1);
        assert_eq!(registry.snapshot(), registry.snapshot());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let registry = DashMapCounterRegistry::new();
        registry.increment(SENT, 1);
        let snap = registry.snapshot();
        registry.increment(SENT, 1);
        assert_eq!(snap.get(SENT), 1);
        assert_eq!(registry.get(SENT), 2);
    }

    #[test]
    fn test_default() {
        let registry = DashMapCounterRegistry::default();
        assert!(registry.snapshot().is_empty());
    }

    // ===== Concurrency Safety Tests =====

    #[test]
    fn test_concurrent_increments() {
        let registry = Arc::new(DashMapCounterRegistry::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let registry = registry.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    registry.increment(SENT, 1);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(registry.get(SENT), 1000);
    }

    #[test]
    fn test_snapshot_never_splits_grouped_increment() {
        let registry = Arc::new(DashMapCounterRegistry::new());
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let registry = registry.clone();
            let done = done.clone();
            thread::spawn(move || {
                for _ in 0..10_000 {
                    registry.increment_many(&[(SENT, 1), (SENT_SINCE_RECONNECT, 1)]);
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        while !done.load(Ordering::SeqCst) {
            let snap = registry.snapshot();
            assert_eq!(snap.get(SENT), snap.get(SENT_SINCE_RECONNECT));
        }
        writer.join().unwrap();

        assert_eq!(registry.get(SENT), 10_000);
        assert_eq!(registry.get(SENT_SINCE_RECONNECT), 10_000);
    }
}
