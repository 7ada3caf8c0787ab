//! TCP Server Adapter
//!
//! Accepts batches from upstream producers and relays them through the
//! forwarding store.

use crate::application::ForwardingStore;
use crate::infrastructure::shutdown::{SessionGuard, ShutdownController};
use crate::infrastructure::wire::{self, Frame, ResultCode};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

/// TCP Server - inbound adapter for upstream producers.
///
/// Each producer session is a sequence of `Log` frames; every frame is
/// forwarded in full and answered with an `Ack` carrying the acknowledged
/// count. A failed forward is answered with `TryLater` so the producer
/// resends the unacknowledged tail.
pub struct TcpServer {
    store: Arc<ForwardingStore>,
    listen_addr: String,
    shutdown: ShutdownController,
}

impl TcpServer {
    pub fn new(
        store: Arc<ForwardingStore>,
        listen_addr: impl Into<String>,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            store,
            listen_addr: listen_addr.into(),
            shutdown,
        }
    }

    /// Bind the configured address and serve until shutdown.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        self.serve(listener).await
    }

    /// Serve producers on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        tracing::info!(
            "log relay listening on {}, forwarding to {}",
            listener.local_addr()?,
            self.store.endpoint()
        );
        let mut stop = self.shutdown.subscribe();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, addr) = accepted?;
                    let store = self.store.clone();
                    let shutdown = self.shutdown.clone();
                    let guard = self.shutdown.session_guard();

                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_producer(store, stream, addr, shutdown, guard).await {
                            tracing::error!("producer session error from {}: {:?}", addr, e);
                        }
                    });
                }
                _ = stop.recv() => {
                    tracing::info!("inbound server stopping");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Relay one producer session.
    async fn handle_producer(
        store: Arc<ForwardingStore>,
        mut stream: TcpStream,
        addr: SocketAddr,
        shutdown: ShutdownController,
        _guard: SessionGuard,
    ) -> anyhow::Result<()> {
        tracing::debug!("producer connected from {}", addr);
        let mut stop = shutdown.subscribe();

        loop {
            let frame = tokio::select! {
                frame = wire::read_frame(&mut stream) => frame?,
                _ = stop.recv() => break,
            };

            let entries = match frame {
                Some(Frame::Log(entries)) => entries,
                Some(other) => {
                    tracing::warn!("unexpected frame from producer {}: {:?}", addr, other);
                    break;
                }
                None => break,
            };

            let reply = match store.forward(&entries).await {
                Ok(acknowledged) => Frame::Ack {
                    acknowledged: acknowledged as u32,
                    code: ResultCode::Ok,
                },
                Err(e) => {
                    tracing::debug!("batch from {} not fully forwarded: {}", addr, e);
                    Frame::Ack {
                        acknowledged: e.acknowledged() as u32,
                        code: ResultCode::TryLater,
                    }
                }
            };
            wire::write_frame(&mut stream, &reply).await?;
        }

        tracing::debug!("producer {} disconnected", addr);
        Ok(())
    }
}
