//! In-Memory Backlog
//!
//! Implements BacklogSource over a queue of batches held in memory.

use crate::domain::entities::LogEntry;
use crate::domain::ports::BacklogSource;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Queue of batches awaiting replay, oldest first.
#[derive(Default)]
pub struct MemoryBacklog {
    batches: Mutex<VecDeque<Vec<LogEntry>>>,
}

impl MemoryBacklog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch at the tail.
    pub fn push(&self, batch: Vec<LogEntry>) {
        if !batch.is_empty() {
            self.batches.lock().push_back(batch);
        }
    }

    /// Number of buffered batches.
    pub fn len(&self) -> usize {
        self.batches.lock().len()
    }

    /// Total number of buffered entries.
    pub fn entry_count(&self) -> usize {
        self.batches.lock().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl BacklogSource for MemoryBacklog {
    async fn read_oldest(&self) -> Option<Vec<LogEntry>> {
        self.batches.lock().front().cloned()
    }

    async fn delete_oldest(&self) {
        self.batches.lock().pop_front();
    }

    async fn replace_oldest(&self, remaining: Vec<LogEntry>) {
        let mut batches = self.batches.lock();
        batches.pop_front();
        if !remaining.is_empty() {
            batches.push_front(remaining);
        }
    }

    async fn is_empty(&self) -> bool {
        self.batches.lock().is_empty()
    }
}
