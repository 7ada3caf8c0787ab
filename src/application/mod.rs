//! Application Layer
//!
//! Use cases that orchestrate the domain through its ports.

mod forwarder_config;
mod forwarding_store;

pub use forwarder_config::ForwarderConfig;
pub use forwarding_store::ForwardingStore;
