use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Process configuration, from environment variables (the deployment path)
/// or a JSON file (the local-dev path). CLI flags override either.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub grpc_addr: String,
    pub metrics_addr: String,
    pub data_dir: String,
    pub redis_url: Option<String>,
    /// Hex-encoded 32-byte ed25519 seed for the token signer. When absent an
    /// ephemeral key is generated and tokens do not survive a restart.
    pub token_seed_hex: Option<String>,
    pub event_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grpc_addr: "0.0.0.0:50051".to_string(),
            metrics_addr: "0.0.0.0:8081".to_string(),
            data_dir: "data".to_string(),
            redis_url: None,
            token_seed_hex: None,
            event_queue_capacity: 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            grpc_addr: env_or("PAYGATE_GRPC_ADDR", &defaults.grpc_addr),
            metrics_addr: env_or("PAYGATE_METRICS_ADDR", &defaults.metrics_addr),
            data_dir: env_or("PAYGATE_DATA_DIR", &defaults.data_dir),
            redis_url: std::env::var("PAYGATE_REDIS_URL").ok().filter(|v| !v.is_empty()),
            token_seed_hex: std::env::var("PAYGATE_TOKEN_SEED")
                .ok()
                .filter(|v| !v.is_empty()),
            event_queue_capacity: std::env::var("PAYGATE_EVENT_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.event_queue_capacity),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            grpc_addr: "127.0.0.1:6000".to_string(),
            ..Config::default()
        };
        config.save_to_file(&path).unwrap();
        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.grpc_addr, "127.0.0.1:6000");
        assert_eq!(loaded.event_queue_capacity, 1024);
    }
}
