//! Reconnect Policy - Domain Service
//!
//! Decides when a connection has carried enough entries that it should be
//! torn down and reopened. Periodic reconnection defends against sticky load
//! balancer assignments and half-open TCP connections.

use crate::domain::value_objects::ReconnectThreshold;
use rand::Rng;

/// Whether the current connection should be recycled.
///
/// Pure: `sent_since_reconnect >= threshold`.
#[inline]
pub fn should_reconnect(sent_since_reconnect: u64, threshold: u64) -> bool {
    sent_since_reconnect >= threshold
}

/// Count-based reconnect policy.
///
/// Holds the configured threshold and an optional jitter `delta`. Each time a
/// connection opens, [`ReconnectPolicy::next_threshold`] draws the effective
/// threshold for that connection uniformly from `[T - d, T + d)`, where
/// `d = min(delta, T - 1)`, so a fleet of relays does not reconnect in lock-step.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    threshold: ReconnectThreshold,
    delta: u64,
}

impl ReconnectPolicy {
    /// Policy with an exact threshold.
    pub fn new(threshold: ReconnectThreshold) -> Self {
        Self {
            threshold,
            delta: 0,
        }
    }

    /// Set the jitter applied to the threshold on each open.
    pub fn with_delta(mut self, delta: u64) -> Self {
        self.delta = delta;
        self
    }

    /// Configured threshold.
    pub fn threshold(&self) -> ReconnectThreshold {
        self.threshold
    }

    /// Jitter actually applied, clamped so the effective threshold stays >= 1.
    pub fn effective_delta(&self) -> u64 {
        self.delta.min(self.threshold.get() - 1)
    }

    /// Draw the effective threshold for a freshly opened connection.
    pub fn next_threshold(&self) -> u64 {
        self.next_threshold_with(&mut rand::thread_rng())
    }

    /// [`next_threshold`](Self::next_threshold) with a caller-supplied RNG.
    pub fn next_threshold_with<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let t = self.threshold.get();
        let d = self.effective_delta();
        if d == 0 {
            return t;
        }
        rng.gen_range(t - d..t + d)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn threshold(v: i64) -> ReconnectThreshold {
        ReconnectThreshold::new(v).unwrap()
    }

    // ===== should_reconnect Tests =====

    #[test]
    fn test_below_threshold() {
        assert!(!should_reconnect(0, 5));
        assert!(!should_reconnect(4, 5));
    }

    #[test]
    fn test_at_threshold() {
        assert!(should_reconnect(5, 5));
    }

    #[test]
    fn test_above_threshold() {
        assert!(should_reconnect(6, 5));
        assert!(should_reconnect(u64::MAX, 1));
    }

    #[test]
    fn test_threshold_one_reconnects_after_every_entry() {
        assert!(!should_reconnect(0, 1));
        assert!(should_reconnect(1, 1));
    }

    // ===== ReconnectPolicy Tests =====

    #[test]
    fn test_no_delta_is_exact() {
        let policy = ReconnectPolicy::new(threshold(5));
        for _ in 0..20 {
            assert_eq!(policy.next_threshold(), 5);
        }
    }

    #[test]
    fn test_delta_stays_in_range() {
        let policy = ReconnectPolicy::new(threshold(100)).with_delta(10);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let t = policy.next_threshold_with(&mut rng);
            assert!((90..110).contains(&t), "threshold {} out of range", t);
        }
    }

    #[test]
    fn test_delta_clamped_below_threshold() {
        let policy = ReconnectPolicy::new(threshold(5)).with_delta(50);
        assert_eq!(policy.effective_delta(), 4);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let t = policy.next_threshold_with(&mut rng);
            assert!(t >= 1 && t < 9, "threshold {} out of range", t);
        }
    }

    #[test]
    fn test_threshold_one_ignores_delta() {
        let policy = ReconnectPolicy::new(threshold(1)).with_delta(3);
        assert_eq!(policy.effective_delta(), 0);
        assert_eq!(policy.next_threshold(), 1);
    }

    #[test]
    fn test_policy_exposes_threshold() {
        let policy = ReconnectPolicy::new(threshold(42));
        assert_eq!(policy.threshold().get(), 42);
    }
}
