//! Graceful Shutdown
//!
//! Stops the inbound server, lets producer sessions finish their current
//! batch, then lets the binary release the downstream connection.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Shutdown coordinator shared by the server, its producer sessions and the
/// binary.
///
/// Both the stop flag and the session count live in `watch` channels, so a
/// listener that subscribes after shutdown began still observes it.
#[derive(Clone)]
pub struct ShutdownController {
    stop: Arc<watch::Sender<bool>>,
    sessions: Arc<watch::Sender<usize>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        let (sessions, _) = watch::channel(0);
        Self {
            stop: Arc::new(stop),
            sessions: Arc::new(sessions),
        }
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.stop.subscribe(),
        }
    }

    /// Begin shutdown. Later calls are no-ops.
    pub fn shutdown(&self) {
        if !self.stop.send_replace(true) {
            tracing::info!(
                active_sessions = self.active_sessions(),
                "initiating graceful shutdown"
            );
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.stop.borrow()
    }

    pub fn active_sessions(&self) -> usize {
        *self.sessions.borrow()
    }

    /// Count a producer session until the guard drops.
    pub fn session_guard(&self) -> SessionGuard {
        self.sessions.send_modify(|n| *n += 1);
        SessionGuard {
            sessions: self.sessions.clone(),
        }
    }

    /// Wait for the session count to reach zero.
    ///
    /// Returns false if sessions were still open after `timeout`.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let mut rx = self.sessions.subscribe();
        let drained = tokio::time::timeout(timeout, async {
            let _ = rx.wait_for(|n| *n == 0).await;
        })
        .await
        .is_ok();

        if !drained {
            tracing::warn!(
                active_sessions = self.active_sessions(),
                "drain timeout expired with producer sessions still open"
            );
        }
        drained
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once shutdown has begun, including if it already had.
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    pub async fn recv(&mut self) {
        // Err means every controller is gone; treat that as a stop too.
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

pub struct SessionGuard {
    sessions: Arc<watch::Sender<usize>>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Initiate shutdown on SIGINT or SIGTERM.
#[cfg_attr(coverage_nightly, coverage(off))]
pub async fn shutdown_signal(controller: ShutdownController) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }

    controller.shutdown();
}
