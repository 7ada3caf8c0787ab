mod dashmap_counter_registry;
mod memory_backlog;
mod tcp_remote_connection;

pub use dashmap_counter_registry::DashMapCounterRegistry;
pub use memory_backlog::MemoryBacklog;
pub use tcp_remote_connection::{TcpRemoteConnection, DEFAULT_TIMEOUT};
