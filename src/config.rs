use crate::application::ForwarderConfig;
use crate::domain::value_objects::Endpoint;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Inbound producer listener
    pub listen_addr: String,
    pub debug: bool,

    // Downstream collector
    pub remote_host: String,
    pub remote_port: u16,
    pub timeout_ms: u64,

    // Reconnect policy
    pub reconnect_threshold: i64,
    pub reconnect_delta: u64,

    pub heartbeat_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:1463".to_string(),
            debug: false,
            remote_host: "127.0.0.1".to_string(),
            remote_port: 1464,
            timeout_ms: 5000,
            reconnect_threshold: 10_000,
            reconnect_delta: 0,
            heartbeat_secs: 60,
        }
    }
}

impl Config {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.remote_host.clone(), self.remote_port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Settings for the forwarding store. The threshold is validated when
    /// the store is built, not here.
    pub fn forwarder_config(&self) -> ForwarderConfig {
        ForwarderConfig::new(self.endpoint(), self.reconnect_threshold)
            .with_reconnect_delta(self.reconnect_delta)
            .with_heartbeat_interval(Duration::from_secs(self.heartbeat_secs))
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Build the configuration from an arbitrary variable lookup.
///
/// Unset or unparseable values fall back to their defaults.
pub fn load_config_from<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();

    let listen_addr = lookup("RELAY_LISTEN_ADDR").unwrap_or(defaults.listen_addr);

    let remote_host = lookup("RELAY_REMOTE_HOST").unwrap_or(defaults.remote_host);

    let remote_port = lookup("RELAY_REMOTE_PORT")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.remote_port);

    let reconnect_threshold = lookup("RELAY_RECONNECT_THRESHOLD")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.reconnect_threshold);

    let reconnect_delta = lookup("RELAY_RECONNECT_DELTA")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.reconnect_delta);

    let timeout_ms = lookup("RELAY_TIMEOUT_MS")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.timeout_ms);

    let heartbeat_secs = lookup("RELAY_HEARTBEAT_SECS")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.heartbeat_secs);

    let debug = lookup("DEBUG").is_some();

    Ok(Config {
        listen_addr,
        debug,
        remote_host,
        remote_port,
        timeout_ms,
        reconnect_threshold,
        reconnect_delta,
        heartbeat_secs,
    })
}
