mod backlog;
mod counter_registry;
mod remote_connection;

pub use backlog::BacklogSource;
pub use counter_registry::{
    category_sent, CounterReader, CounterRegistry, CounterSnapshot, CONNECT_FAILURES,
    RECONNECTS, SEND_FAILURES, SENT, SENT_SINCE_RECONNECT,
};
pub use remote_connection::{RemoteConnection, SendError, TransportError};
