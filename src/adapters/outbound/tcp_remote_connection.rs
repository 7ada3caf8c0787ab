//! TCP Remote Connection
//!
//! Implements RemoteConnection over a single TCP stream speaking the relay
//! wire framing. One `Log` frame per batch, answered by one `Ack` frame.

use crate::domain::entities::LogEntry;
use crate::domain::ports::{RemoteConnection, SendError, TransportError};
use crate::domain::value_objects::Endpoint;
use crate::infrastructure::wire::{self, Frame, ResultCode, WireError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use uuid::Uuid;

/// Default connect/read/write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// An open socket plus the identity used to correlate its log lines.
struct OpenStream {
    stream: TcpStream,
    endpoint: Endpoint,
    id: Uuid,
}

/// TCP connection to a downstream collector.
///
/// The timeout applies separately to connect, to writing a batch and to
/// waiting for its acknowledgement; expiry surfaces as `TransportError::Timeout`.
pub struct TcpRemoteConnection {
    timeout: Duration,
    current: Option<OpenStream>,
}

impl TcpRemoteConnection {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            current: None,
        }
    }

    /// Identifier of the current physical connection, if any.
    pub fn connection_id(&self) -> Option<Uuid> {
        self.current.as_ref().map(|c| c.id)
    }
}

impl Default for TcpRemoteConnection {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

fn transport_error(e: WireError) -> TransportError {
    match e {
        WireError::Io(io) => TransportError::Io(io),
        other => TransportError::Protocol(other.to_string()),
    }
}

#[async_trait]
impl RemoteConnection for TcpRemoteConnection {
    async fn open(&mut self, endpoint: &Endpoint) -> Result<(), TransportError> {
        if self.current.is_some() {
            self.close().await;
        }

        let stream =
            match tokio::time::timeout(self.timeout, TcpStream::connect(endpoint.socket_addr()))
                .await
            {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => return Err(TransportError::Connect(e.to_string())),
                Err(_) => return Err(TransportError::Timeout),
            };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "failed to set TCP_NODELAY");
        }

        let id = Uuid::new_v4();
        tracing::info!(conn_id = %id, "opened connection to remote collector <{}>", endpoint);
        self.current = Some(OpenStream {
            stream,
            endpoint: endpoint.clone(),
            id,
        });
        Ok(())
    }

    async fn send_batch(&mut self, entries: &[LogEntry]) -> Result<usize, SendError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let open = self
            .current
            .as_mut()
            .ok_or_else(|| SendError::new(0, TransportError::NotOpen))?;

        let request = Frame::Log(entries.to_vec());
        match tokio::time::timeout(self.timeout, wire::write_frame(&mut open.stream, &request))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(SendError::new(0, transport_error(e))),
            Err(_) => return Err(SendError::new(0, TransportError::Timeout)),
        }

        let reply = match tokio::time::timeout(self.timeout, wire::read_frame(&mut open.stream))
            .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => return Err(SendError::new(0, transport_error(e))),
            Err(_) => return Err(SendError::new(0, TransportError::Timeout)),
        };

        match reply {
            Some(Frame::Ack { acknowledged, code }) => {
                let acknowledged = (acknowledged as usize).min(entries.len());
                match code {
                    ResultCode::Ok if acknowledged == entries.len() => Ok(acknowledged),
                    ResultCode::Ok => Err(SendError::new(
                        acknowledged,
                        TransportError::Protocol(format!(
                            "collector acknowledged {} of {} entries",
                            acknowledged,
                            entries.len()
                        )),
                    )),
                    ResultCode::TryLater => {
                        Err(SendError::new(acknowledged, TransportError::TryLater))
                    }
                }
            }
            Some(other) => Err(SendError::new(
                0,
                TransportError::Protocol(format!("unexpected reply {:?}", other)),
            )),
            None => Err(SendError::new(
                0,
                TransportError::Protocol("connection closed by collector".into()),
            )),
        }
    }

    async fn close(&mut self) {
        if let Some(mut open) = self.current.take() {
            tracing::info!(conn_id = %open.id, "closing connection to remote collector <{}>", open.endpoint);
            if let Err(e) = open.stream.shutdown().await {
                tracing::debug!(conn_id = %open.id, error = %e, "error while closing connection");
            }
        }
    }

    fn is_open(&self) -> bool {
        self.current.is_some()
    }
}
