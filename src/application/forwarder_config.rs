//! Forwarder Configuration
//!
//! Settings consumed once when a forwarding store is constructed.

use crate::domain::value_objects::Endpoint;
use std::time::Duration;

/// Configuration for a forwarding store.
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Downstream collector
    pub endpoint: Endpoint,

    /// Entries per connection before a proactive reconnect.
    /// Must be positive; validated at construction.
    pub reconnect_threshold: i64,

    /// Jitter applied to the threshold each time a connection opens (default: 0)
    pub reconnect_delta: u64,

    /// Minimum time between per-category send count log lines (default: 60s)
    pub heartbeat_interval: Duration,
}

impl ForwarderConfig {
    /// Create a configuration for an endpoint and threshold.
    pub fn new(endpoint: Endpoint, reconnect_threshold: i64) -> Self {
        Self {
            endpoint,
            reconnect_threshold,
            reconnect_delta: 0,
            heartbeat_interval: Duration::from_secs(60),
        }
    }

    /// Set the reconnect jitter.
    pub fn with_reconnect_delta(mut self, delta: u64) -> Self {
        self.reconnect_delta = delta;
        self
    }

    /// Set the heartbeat interval.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ForwarderConfig::new(Endpoint::new("localhost", 1463), 5);
        assert_eq!(cfg.reconnect_threshold, 5);
        assert_eq!(cfg.reconnect_delta, 0);
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_builder() {
        let cfg = ForwarderConfig::new(Endpoint::new("localhost", 1463), 100)
            .with_reconnect_delta(10)
            .with_heartbeat_interval(Duration::from_secs(5));
        assert_eq!(cfg.reconnect_delta, 10);
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(5));
    }
}
