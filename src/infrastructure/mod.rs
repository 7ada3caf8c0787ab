//! Infrastructure Layer
//!
//! Cross-cutting concerns shared by the adapters and the binary.

pub mod shutdown;
pub mod wire;

pub use shutdown::{shutdown_signal, SessionGuard, ShutdownController, ShutdownListener};
pub use wire::{Frame, ResultCode, WireError};
