//! Domain Layer
//!
//! Core relay concepts, the ports the application talks through, and the
//! reconnect decision. Nothing here performs I/O.

pub mod entities;
pub mod error;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{ConnectionState, LogEntry};
pub use error::ForwardError;
pub use value_objects::{Endpoint, ReconnectThreshold};
