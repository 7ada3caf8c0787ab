//! Backlog Source Port
//!
//! Defines the interface for replaying entries buffered while the collector
//! was unreachable. Persistence is the implementation's concern.

use crate::domain::entities::LogEntry;
use async_trait::async_trait;

/// Oldest-first source of buffered batches.
///
/// The forwarding store reads the oldest batch, sends it, and then either
/// deletes it (fully acknowledged) or replaces it with the unacknowledged
/// remainder.
#[async_trait]
pub trait BacklogSource: Send + Sync {
    /// Oldest buffered batch, without removing it.
    async fn read_oldest(&self) -> Option<Vec<LogEntry>>;

    /// Drop the oldest batch.
    async fn delete_oldest(&self);

    /// Replace the oldest batch with `remaining`.
    async fn replace_oldest(&self, remaining: Vec<LogEntry>);

    /// Whether nothing is left to replay.
    async fn is_empty(&self) -> bool;
}
