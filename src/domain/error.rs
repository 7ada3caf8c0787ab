//! Forwarding Errors
//!
//! Errors reported by the forwarding store to its callers.

use crate::domain::value_objects::Endpoint;

/// Error returned by a submission or by store construction.
///
/// `Connection` and `Transmission` are retryable: the caller decides whether
/// and when to resubmit. `PolicyViolation` is fatal and only occurs at
/// construction time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForwardError {
    /// Opening the connection to the collector failed.
    #[error("failed to open connection to {endpoint}: {reason}")]
    Connection { endpoint: Endpoint, reason: String },

    /// Sending failed after the connection was established.
    ///
    /// `acknowledged` entries (a prefix of the batch) were delivered and
    /// counted; the caller must resend the rest.
    #[error("failed to send to {endpoint} ({acknowledged} acknowledged): {reason}")]
    Transmission {
        endpoint: Endpoint,
        acknowledged: usize,
        reason: String,
    },

    /// Invalid configuration supplied at construction.
    #[error("policy violation: {0}")]
    PolicyViolation(String),
}

impl ForwardError {
    /// Whether resubmitting may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ForwardError::PolicyViolation(_))
    }

    /// Number of entries of the submitted batch delivered before the failure.
    pub fn acknowledged(&self) -> usize {
        match self {
            ForwardError::Transmission { acknowledged, .. } => *acknowledged,
            _ => 0,
        }
    }
}
