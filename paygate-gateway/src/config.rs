use serde::{Deserialize, Serialize};

/// Gateway process configuration from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub http_addr: String,
    /// Endpoint of the domain-service node, e.g. `http://127.0.0.1:50051`.
    pub node_addr: String,
    /// Per-request budget applied to every downstream RPC.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            node_addr: "http://127.0.0.1:50051".to_string(),
            request_timeout_secs: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            http_addr: env_or("PAYGATE_HTTP_ADDR", &defaults.http_addr),
            node_addr: env_or("PAYGATE_NODE_ADDR", &defaults.node_addr),
            request_timeout_secs: std::env::var("PAYGATE_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
