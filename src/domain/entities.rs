//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of the relay domain.
//! They have no external dependencies beyond serialization.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A single log entry relayed downstream.
///
/// Immutable once created; cloning is cheap because the payload is
/// reference-counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Category the entry was logged under
    pub category: String,
    /// Opaque message payload
    pub message: Bytes,
}

impl LogEntry {
    pub fn new(category: impl Into<String>, message: impl Into<Bytes>) -> Self {
        Self {
            category: category.into(),
            message: message.into(),
        }
    }
}

/// Connection state of a forwarding store.
///
/// Exactly one value per store; it is the single source of truth for
/// whether sends may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No connection held (initial state, and after shutdown)
    Disconnected,
    /// Opening, or waiting for the caller to retry an open
    Connecting,
    /// Replaying a backlog before accepting live batches
    SendingBuffer,
    /// Steady state: live batches are forwarded
    Streaming,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::SendingBuffer => "SENDING_BUFFER",
            Self::Streaming => "STREAMING",
        }
    }

    /// Encode for storage in an atomic.
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::SendingBuffer => 2,
            Self::Streaming => 3,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Connecting,
            2 => Self::SendingBuffer,
            3 => Self::Streaming,
            _ => Self::Disconnected,
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_new() {
        let entry = LogEntry::new("TestReconnection", "This is message 0");
        assert_eq!(entry.category, "TestReconnection");
        assert_eq!(entry.message, Bytes::from_static(b"This is message 0"));
    }

    #[test]
    fn test_log_entry_from_vec() {
        let entry = LogEntry::new("cat", vec![0u8, 1, 2]);
        assert_eq!(entry.message.len(), 3);
    }

    #[test]
    fn test_log_entry_clone_shares_payload() {
        let entry = LogEntry::new("cat", vec![7u8; 1024]);
        let cloned = entry.clone();
        assert_eq!(entry, cloned);
        assert_eq!(entry.message.as_ptr(), cloned.message.as_ptr());
    }

    #[test]
    fn test_state_default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Streaming.to_string(), "STREAMING");
        assert_eq!(ConnectionState::SendingBuffer.to_string(), "SENDING_BUFFER");
    }

    #[test]
    fn test_state_u8_encoding() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::SendingBuffer,
            ConnectionState::Streaming,
        ] {
            assert_eq!(ConnectionState::from_u8(state.to_u8()), state);
        }
        assert_eq!(ConnectionState::from_u8(200), ConnectionState::Disconnected);
    }
}
