use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::{info, warn};

const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_WS_ADDR: &str = "127.0.0.1:9001";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub http_addr: SocketAddr,
    pub ws_addr: SocketAddr,
    /// `None` keeps all state in memory.
    pub data_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Reads configuration from the environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, String> {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("Ignoring unreadable .env file: {}", e),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let addr = |key: &str, default: &str| -> Result<SocketAddr, String> {
            let raw = lookup(key).unwrap_or_else(|| default.to_string());
            raw.parse()
                .map_err(|e| format!("{} has invalid address {:?}: {}", key, raw, e))
        };
        let http_addr = addr("CATLAB_HTTP_ADDR", DEFAULT_HTTP_ADDR)?;
        let ws_addr = addr("CATLAB_WS_ADDR", DEFAULT_WS_ADDR)?;

        let in_memory = lookup("CATLAB_IN_MEMORY")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let data_dir = if in_memory {
            None
        } else {
            match lookup("CATLAB_DATA_DIR").filter(|d| !d.is_empty()) {
                Some(dir) => Some(PathBuf::from(dir)),
                None => Some(
                    dirs::data_local_dir()
                        .ok_or_else(|| "no platform data dir; set CATLAB_DATA_DIR".to_string())?
                        .join("catlab"),
                ),
            }
        };

        Ok(Self {
            http_addr,
            ws_addr,
            data_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn explicit_values_win() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("CATLAB_HTTP_ADDR", "0.0.0.0:8080"),
            ("CATLAB_WS_ADDR", "0.0.0.0:8081"),
            ("CATLAB_DATA_DIR", "/var/lib/catlab"),
        ]))
        .unwrap();
        assert_eq!(config.http_addr.port(), 8080);
        assert_eq!(config.ws_addr.port(), 8081);
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/catlab")));
    }

    #[test]
    fn in_memory_disables_data_dir() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("CATLAB_IN_MEMORY", "true"),
            ("CATLAB_DATA_DIR", "/ignored"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, None);
        assert_eq!(config.http_addr.to_string(), DEFAULT_HTTP_ADDR);
    }

    #[test]
    fn bad_address_is_an_error() {
        let err = ServerConfig::from_lookup(lookup(&[("CATLAB_WS_ADDR", "not-an-addr")]))
            .unwrap_err();
        assert!(err.contains("CATLAB_WS_ADDR"));
    }
}
