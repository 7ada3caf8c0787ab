//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use crate::domain::error::ForwardError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;

/// Downstream collector address.
///
/// Fixed for the lifetime of a forwarding store; there is no dynamic
/// endpoint discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Collector host name or IP address
    pub host: String,
    /// Collector port
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Address string suitable for `TcpStream::connect`.
    ///
    /// IPv6 literals are bracketed.
    pub fn socket_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Maximum number of entries sent over one physical connection before it is
/// torn down and reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReconnectThreshold(NonZeroU64);

impl ReconnectThreshold {
    /// Validate a configured threshold.
    ///
    /// Zero and negative values are rejected with [`ForwardError::PolicyViolation`].
    pub fn new(value: i64) -> Result<Self, ForwardError> {
        u64::try_from(value)
            .ok()
            .and_then(NonZeroU64::new)
            .map(Self)
            .ok_or_else(|| {
                ForwardError::PolicyViolation(format!(
                    "reconnect threshold must be positive, got {}",
                    value
                ))
            })
    }

    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for ReconnectThreshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
