//! log-relay - Log forwarding tier with periodic connection recycling
//!
//! This is the composition root that wires together all the components.

use log_relay::infrastructure::shutdown_signal;
use log_relay::{
    load_config, DashMapCounterRegistry, ForwardingStore, ShutdownController, TcpRemoteConnection,
    TcpServer,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!(
        "starting log-relay listen={} remote={} threshold={} delta={}",
        cfg.listen_addr,
        cfg.endpoint(),
        cfg.reconnect_threshold,
        cfg.reconnect_delta
    );

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapters
    let counters = Arc::new(DashMapCounterRegistry::new());
    let connection = Box::new(TcpRemoteConnection::new(cfg.timeout()));

    // 2. Application service; rejects a non-positive threshold
    let store = Arc::new(ForwardingStore::new(
        cfg.forwarder_config(),
        connection,
        counters,
    )?);

    // 3. Inbound adapter with graceful shutdown
    let shutdown = ShutdownController::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let server = TcpServer::new(store.clone(), cfg.listen_addr.clone(), shutdown.clone());
    let served = server.run().await;
    shutdown.shutdown();

    shutdown.wait_for_drain(DRAIN_TIMEOUT).await;
    store.shutdown().await;

    let snapshot = store.counters().snapshot();
    match serde_json::to_string(&snapshot) {
        Ok(json) => tracing::info!("final counters: {}", json),
        Err(e) => tracing::warn!("failed to serialize counters: {}", e),
    }

    served
}
