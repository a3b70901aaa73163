//! Client configuration

use std::env;

/// Default etcd client endpoint
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:4001";

/// Configuration options for the etcd client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base endpoint URL (default: http://127.0.0.1:4001)
    pub endpoint: String,
    /// Timeout for every operation except watches, in milliseconds.
    /// Watches wait as long as etcd keeps the request open.
    pub timeout_ms: Option<u64>,
    /// How long an idle pooled connection is kept, in milliseconds.
    /// `None` keeps the transport's default.
    pub pool_idle_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: None,
            pool_idle_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    /// Configuration for the given endpoint with all other options defaulted
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Read configuration from `ETCD_ENDPOINT`, `ETCD_TIMEOUT_MS` and
    /// `ETCD_POOL_IDLE_TIMEOUT_MS`.
    ///
    /// Missing or unparseable numbers fall back to their defaults. The
    /// endpoint is validated when the client is built.
    pub fn from_env() -> Self {
        let endpoint = env::var("ETCD_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let timeout_ms = env::var("ETCD_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok());
        let pool_idle_timeout_ms = env::var("ETCD_POOL_IDLE_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok());

        ClientConfig {
            endpoint,
            timeout_ms,
            pool_idle_timeout_ms,
        }
    }
}
