mod reconnect_policy;

pub use reconnect_policy::{should_reconnect, ReconnectPolicy};
