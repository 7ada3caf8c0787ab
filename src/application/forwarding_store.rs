//! Forwarding Store - Main application use case
//!
//! Relays inbound batches to the downstream collector over a single
//! persistent connection, recycling that connection after a configured
//! number of entries so that load-balancer stickiness and one-sided TCP
//! failures cannot pin the relay to a bad peer.
//!
//! # State machine
//!
//! ```text
//!   DISCONNECTED ──batch──▶ CONNECTING ──open ok──▶ [SENDING_BUFFER] ──▶ STREAMING
//!                              ▲   │ open failed (stay, report)             │
//!                              │   ▼                                        │
//!                              └── send failed / threshold reached ◀────────┘
//! ```
//!
//! One submission at a time runs the read-decide-act sequence under the
//! store's mutex. Counters are written through the shared registry, never
//! while waiting on the connection.

use crate::application::forwarder_config::ForwarderConfig;
use crate::domain::entities::{ConnectionState, LogEntry};
use crate::domain::error::ForwardError;
use crate::domain::ports::{
    category_sent, BacklogSource, CounterReader, CounterRegistry, RemoteConnection,
    CONNECT_FAILURES, RECONNECTS, SEND_FAILURES, SENT, SENT_SINCE_RECONNECT,
};
use crate::domain::services::{should_reconnect, ReconnectPolicy};
use crate::domain::value_objects::{Endpoint, ReconnectThreshold};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Per-category send counts logged periodically as a liveness signal.
struct Heartbeat {
    last: Instant,
    counts: BTreeMap<String, u64>,
}

/// Outcome of draining the backlog over one connection.
enum Replay {
    Drained,
    ThresholdReached(u64),
}

/// State guarded by the store mutex.
struct Inner {
    connection: Box<dyn RemoteConnection>,
    /// Threshold drawn for the current physical connection
    effective_threshold: u64,
    heartbeat: Heartbeat,
}

/// Forwarding store - relays batches to one downstream endpoint.
pub struct ForwardingStore {
    endpoint: Endpoint,
    policy: ReconnectPolicy,
    counters: Arc<dyn CounterRegistry>,
    backlog: Option<Arc<dyn BacklogSource>>,
    heartbeat_interval: Duration,
    /// Mirror of the current `ConnectionState`, readable without the lock
    state: AtomicU8,
    inner: Mutex<Inner>,
}

impl ForwardingStore {
    /// Create a store in `DISCONNECTED` state.
    ///
    /// Fails with [`ForwardError::PolicyViolation`] if the threshold is not
    /// positive. No connection is attempted here.
    pub fn new(
        config: ForwarderConfig,
        connection: Box<dyn RemoteConnection>,
        counters: Arc<dyn CounterRegistry>,
    ) -> Result<Self, ForwardError> {
        let threshold = ReconnectThreshold::new(config.reconnect_threshold)?;
        let policy = ReconnectPolicy::new(threshold).with_delta(config.reconnect_delta);

        // The registry may be shared; this store's counts start from zero.
        counters.reset(SENT);
        counters.reset(SENT_SINCE_RECONNECT);

        Ok(Self {
            endpoint: config.endpoint,
            policy,
            counters,
            backlog: None,
            heartbeat_interval: config.heartbeat_interval,
            state: AtomicU8::new(ConnectionState::Disconnected.to_u8()),
            inner: Mutex::new(Inner {
                connection,
                effective_threshold: threshold.get(),
                heartbeat: Heartbeat {
                    last: Instant::now(),
                    counts: BTreeMap::new(),
                },
            }),
        })
    }

    /// Attach a backlog to replay before streaming after each successful open.
    pub fn with_backlog(mut self, backlog: Arc<dyn BacklogSource>) -> Self {
        self.backlog = Some(backlog);
        self
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Downstream endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Reconnect policy in force.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Read-only handle on the counters for monitoring.
    pub fn counters(&self) -> CounterReader {
        CounterReader::new(self.counters.clone())
    }

    /// Forward messages logged under one category.
    pub async fn submit(
        &self,
        category: &str,
        messages: Vec<Bytes>,
    ) -> Result<usize, ForwardError> {
        let entries: Vec<LogEntry> = messages
            .into_iter()
            .map(|m| LogEntry::new(category, m))
            .collect();
        self.forward(&entries).await
    }

    /// Forward a batch, preserving order.
    ///
    /// Returns the number of entries acknowledged. On error the caller must
    /// resend `entries[err.acknowledged()..]`.
    pub async fn forward(&self, entries: &[LogEntry]) -> Result<usize, ForwardError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut inner = self.inner.lock().await;

        if self.state() != ConnectionState::Streaming {
            self.establish(&mut inner).await?;
        }

        let total = entries.len();
        let (acknowledged, failure) = match inner.connection.send_batch(entries).await {
            Ok(n) if n >= total => (total, None),
            Ok(n) => (
                n,
                Some(format!("collector acknowledged {} of {} entries", n, total)),
            ),
            Err(e) => (e.acknowledged.min(total), Some(e.source.to_string())),
        };

        if let Some(reason) = failure {
            return Err(self.send_failed(&mut inner, entries, acknowledged, reason).await);
        }

        self.record_sent(&mut inner.heartbeat, entries);
        let since = self.counters.get(SENT_SINCE_RECONNECT);
        tracing::debug!(
            "successfully sent <{}> messages to remote collector <{}> (<{}> since last reconnection)",
            total,
            self.endpoint,
            since
        );
        self.maybe_log_heartbeat(&mut inner.heartbeat);

        if should_reconnect(since, inner.effective_threshold) {
            self.reconnect(&mut inner, since).await;
        }

        Ok(total)
    }

    /// Open the connection ahead of the first batch. No-op when streaming.
    pub async fn open(&self) -> Result<(), ForwardError> {
        let mut inner = self.inner.lock().await;
        if self.state() == ConnectionState::Streaming {
            return Ok(());
        }
        self.establish(&mut inner).await
    }

    /// Release the connection and return to `DISCONNECTED`.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.connection.close().await;
        self.transition(ConnectionState::Disconnected);
    }

    fn transition(&self, next: ConnectionState) {
        let prev = ConnectionState::from_u8(self.state.swap(next.to_u8(), Ordering::SeqCst));
        if prev != next {
            tracing::info!("changing state from <{}> to <{}>", prev, next);
        }
    }

    /// CONNECTING → open → (SENDING_BUFFER →) STREAMING.
    ///
    /// The threshold also applies while draining the backlog: when replay
    /// reaches it, the connection is recycled and draining resumes on the
    /// next one.
    async fn establish(&self, inner: &mut Inner) -> Result<(), ForwardError> {
        loop {
            self.transition(ConnectionState::Connecting);

            if let Err(e) = inner.connection.open(&self.endpoint).await {
                self.counters.increment(CONNECT_FAILURES, 1);
                tracing::warn!(
                    "failed to open connection to remote collector <{}>: {}",
                    self.endpoint,
                    e
                );
                return Err(ForwardError::Connection {
                    endpoint: self.endpoint.clone(),
                    reason: e.to_string(),
                });
            }

            inner.effective_threshold = self.policy.next_threshold();
            tracing::debug!(
                "reconnect threshold for <{}> is <{}>",
                self.endpoint,
                inner.effective_threshold
            );

            if let Some(backlog) = self.backlog.clone() {
                if !backlog.is_empty().await {
                    self.transition(ConnectionState::SendingBuffer);
                    if let Replay::ThresholdReached(since) =
                        self.replay_backlog(inner, backlog.as_ref()).await?
                    {
                        self.recycle(inner, since).await;
                        continue;
                    }
                }
            }

            self.transition(ConnectionState::Streaming);
            return Ok(());
        }
    }

    async fn replay_backlog(
        &self,
        inner: &mut Inner,
        backlog: &dyn BacklogSource,
    ) -> Result<Replay, ForwardError> {
        let mut replayed = 0usize;

        while let Some(batch) = backlog.read_oldest().await {
            if batch.is_empty() {
                backlog.delete_oldest().await;
                continue;
            }

            let total = batch.len();
            let failure = match inner.connection.send_batch(&batch).await {
                Ok(n) if n >= total => None,
                Ok(n) => Some((n, format!("collector acknowledged {} of {} entries", n, total))),
                Err(e) => Some((e.acknowledged.min(total), e.source.to_string())),
            };

            if let Some((acknowledged, reason)) = failure {
                self.record_sent(&mut inner.heartbeat, &batch[..acknowledged]);
                backlog.replace_oldest(batch[acknowledged..].to_vec()).await;
                self.counters.increment(SEND_FAILURES, 1);
                tracing::warn!(
                    "backlog replay to <{}> failed after <{}> messages: {}",
                    self.endpoint,
                    replayed + acknowledged,
                    reason
                );
                inner.connection.close().await;
                self.transition(ConnectionState::Connecting);
                return Err(ForwardError::Transmission {
                    endpoint: self.endpoint.clone(),
                    acknowledged: 0,
                    reason: format!("backlog replay failed: {}", reason),
                });
            }

            self.record_sent(&mut inner.heartbeat, &batch);
            backlog.delete_oldest().await;
            replayed += total;

            let since = self.counters.get(SENT_SINCE_RECONNECT);
            if should_reconnect(since, inner.effective_threshold) {
                tracing::debug!(
                    "replayed <{}> backlog messages to <{}> before reaching the threshold",
                    replayed,
                    self.endpoint
                );
                return Ok(Replay::ThresholdReached(since));
            }
        }

        tracing::info!(
            "no more backlog to send to <{}>, switching to streaming mode (<{}> messages replayed)",
            self.endpoint,
            replayed
        );
        Ok(Replay::Drained)
    }

    /// Threshold reached: recycle the connection and reopen once.
    ///
    /// A failed reopen leaves the store in CONNECTING; the next submission
    /// retries the open.
    async fn reconnect(&self, inner: &mut Inner, since: u64) {
        self.recycle(inner, since).await;
        if let Err(e) = self.establish(inner).await {
            tracing::warn!("reopen after reconnect threshold failed, will retry on next batch: {}", e);
        }
    }

    /// Close the connection and reset the per-connection count.
    async fn recycle(&self, inner: &mut Inner, since: u64) {
        tracing::info!(
            "sent <{}> messages since last reconnect to <{}>, threshold is <{}>, re-opening the connection",
            since,
            self.endpoint,
            inner.effective_threshold
        );

        inner.connection.close().await;
        self.counters.reset(SENT_SINCE_RECONNECT);
        self.counters.increment(RECONNECTS, 1);
        self.transition(ConnectionState::Connecting);
    }

    async fn send_failed(
        &self,
        inner: &mut Inner,
        entries: &[LogEntry],
        acknowledged: usize,
        reason: String,
    ) -> ForwardError {
        self.record_sent(&mut inner.heartbeat, &entries[..acknowledged]);
        self.counters.increment(SEND_FAILURES, 1);
        tracing::warn!(
            "failed to send <{}> messages to remote collector <{}> (<{}> acknowledged): {}",
            entries.len(),
            self.endpoint,
            acknowledged,
            reason
        );

        inner.connection.close().await;
        self.transition(ConnectionState::Connecting);

        ForwardError::Transmission {
            endpoint: self.endpoint.clone(),
            acknowledged,
            reason,
        }
    }

    /// Credit acknowledged entries to `sent`, `sent_since_reconnect` and the
    /// per-category counters in one registry step.
    fn record_sent(&self, heartbeat: &mut Heartbeat, entries: &[LogEntry]) {
        if entries.is_empty() {
            return;
        }
        let n = entries.len() as u64;

        let mut per_category: BTreeMap<&str, u64> = BTreeMap::new();
        for entry in entries {
            *per_category.entry(entry.category.as_str()).or_default() += 1;
        }
        let names: Vec<(String, u64)> = per_category
            .iter()
            .map(|(category, count)| (category_sent(category), *count))
            .collect();

        let mut deltas: Vec<(&str, u64)> = Vec::with_capacity(2 + names.len());
        deltas.push((SENT, n));
        deltas.push((SENT_SINCE_RECONNECT, n));
        deltas.extend(names.iter().map(|(name, count)| (name.as_str(), *count)));
        self.counters.increment_many(&deltas);

        for (category, count) in per_category {
            *heartbeat.counts.entry(category.to_string()).or_default() += count;
        }
    }

    fn maybe_log_heartbeat(&self, heartbeat: &mut Heartbeat) {
        if heartbeat.last.elapsed() < self.heartbeat_interval {
            return;
        }
        for (category, count) in &heartbeat.counts {
            tracing::info!("send counts <{}>: {}:sent={}", self.endpoint, category, count);
        }
        heartbeat.counts.clear();
        heartbeat.last = Instant::now();
    }
}
