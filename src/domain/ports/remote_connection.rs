//! Remote Connection Port
//!
//! Defines the interface for a single outbound connection to a collector.

use crate::domain::entities::LogEntry;
use crate::domain::value_objects::Endpoint;
use async_trait::async_trait;

/// Transport-level failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established
    #[error("connect error: {0}")]
    Connect(String),
    /// The operation exceeded the configured timeout
    #[error("timed out")]
    Timeout,
    /// Socket error
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The collector refused the batch and asked to retry later
    #[error("collector asked to try later")]
    TryLater,
    /// The collector answered with something unexpected
    #[error("protocol error: {0}")]
    Protocol(String),
    /// `send_batch` was called without an open connection
    #[error("connection is not open")]
    NotOpen,
}

/// A failed `send_batch`.
///
/// `acknowledged` entries at the front of the batch were accepted before
/// the failure.
#[derive(Debug, thiserror::Error)]
#[error("{source} ({acknowledged} acknowledged)")]
pub struct SendError {
    pub acknowledged: usize,
    #[source]
    pub source: TransportError,
}

impl SendError {
    pub fn new(acknowledged: usize, source: TransportError) -> Self {
        Self {
            acknowledged,
            source,
        }
    }
}

/// A single outbound connection to a downstream collector.
///
/// This is an outbound port. Implementations never retry and never
/// reconnect on their own; the forwarding store owns that policy.
/// Successful `open` and `close` are the only points where a physical
/// socket is created or destroyed.
#[async_trait]
pub trait RemoteConnection: Send {
    /// Establish the transport connection.
    async fn open(&mut self, endpoint: &Endpoint) -> Result<(), TransportError>;

    /// Transmit entries in order, returning how many were acknowledged.
    async fn send_batch(&mut self, entries: &[LogEntry]) -> Result<usize, SendError>;

    /// Release the connection. Idempotent.
    async fn close(&mut self);

    /// Whether a physical connection is currently held.
    fn is_open(&self) -> bool;
}
