// Relay server configuration.
//
// Environment variables with defaults for local development.

use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8787;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listen address (host:port).
    pub listen_addr: SocketAddr,
    /// Comma-separated CORS origins (or `"*"` for any).
    pub cors_origins: Option<String>,
    /// Log filter directive (e.g. `info`, `pagedraft_relay=debug`).
    pub log_filter: String,
    /// How long after start-up draft writes and `/healthz` answer 412.
    pub warmup: Duration,
}

impl RelayConfig {
    /// Parse configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `PAGEDRAFT_RELAY_HOST` | `127.0.0.1` |
    /// | `PAGEDRAFT_RELAY_PORT` | `8787` |
    /// | `PAGEDRAFT_RELAY_CORS_ORIGINS` | *(none; cors.rs uses dev defaults)* |
    /// | `PAGEDRAFT_RELAY_LOG_FILTER` | `info` |
    /// | `PAGEDRAFT_RELAY_WARMUP_MS` | `0` |
    pub fn from_env() -> Self {
        Self::from_env_fn(|key| std::env::var(key))
    }

    /// Testable constructor that accepts an environment lookup function.
    fn from_env_fn<F>(env: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let host = env("PAGEDRAFT_RELAY_HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let port: u16 =
            env("PAGEDRAFT_RELAY_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_PORT);
        let listen_addr = format!("{host}:{port}")
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], port)));

        let cors_origins = env("PAGEDRAFT_RELAY_CORS_ORIGINS").ok();
        let log_filter = env("PAGEDRAFT_RELAY_LOG_FILTER").unwrap_or_else(|_| "info".into());
        let warmup = env("PAGEDRAFT_RELAY_WARMUP_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO);

        Self { listen_addr, cors_origins, log_filter, warmup }
    }
}
