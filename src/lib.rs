//! log-relay Library
//!
//! This module exposes the relay components for use in integration tests
//! and as a library.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use adapters::inbound::TcpServer;
pub use adapters::outbound::{DashMapCounterRegistry, MemoryBacklog, TcpRemoteConnection};
pub use application::{ForwarderConfig, ForwardingStore};
pub use config::{load_config, Config};
pub use domain::entities::{ConnectionState, LogEntry};
pub use domain::error::ForwardError;
pub use domain::ports::{
    BacklogSource, CounterReader, CounterRegistry, CounterSnapshot, RemoteConnection,
};
pub use domain::services::{should_reconnect, ReconnectPolicy};
pub use domain::value_objects::{Endpoint, ReconnectThreshold};
pub use infrastructure::ShutdownController;
