use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::favorites::DEFAULT_FAVORITES_FILE;
use crate::omdb::OMDB_BASE;
use crate::suggestions::DEFAULT_SUGGESTION_LIMIT;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3147";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_SUGGESTION_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct Config {
    pub omdb_api_key: String,
    pub omdb_base_url: String,
    pub favorites_path: PathBuf,
    pub suggestion_limit: usize,
    pub request_timeout: Duration,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let omdb_api_key = get("OMDB_API_KEY")
            .ok_or_else(|| anyhow::anyhow!("Missing required environment variable: OMDB_API_KEY"))?;
        let omdb_base_url = get("OMDB_BASE_URL").unwrap_or_else(|| OMDB_BASE.to_string());
        let favorites_path = get("FAVORITES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FAVORITES_FILE));

        let suggestion_limit = match get("SUGGESTION_LIMIT") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("SUGGESTION_LIMIT must be a number, got '{}'", raw))?
                .clamp(1, MAX_SUGGESTION_LIMIT),
            None => DEFAULT_SUGGESTION_LIMIT,
        };

        let timeout_secs = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) | Err(_) => {
                    warn!(
                        "Ignoring invalid REQUEST_TIMEOUT_SECS '{}', using {}s",
                        raw, DEFAULT_TIMEOUT_SECS
                    );
                    DEFAULT_TIMEOUT_SECS
                }
                Ok(n) => n,
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .with_context(|| format!("BIND_ADDR is not a socket address: '{}'", bind_raw))?;

        info!(
            "Config: base_url={}, favorites={:?}, suggestions={}, timeout={}s",
            omdb_base_url, favorites_path, suggestion_limit, timeout_secs
        );

        Ok(Self {
            omdb_api_key,
            omdb_base_url,
            favorites_path,
            suggestion_limit,
            request_timeout: Duration::from_secs(timeout_secs),
            bind_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let cfg = config_from(&[("OMDB_API_KEY", "abc123")]).unwrap();
        assert_eq!(cfg.omdb_base_url, OMDB_BASE);
        assert_eq!(cfg.favorites_path, PathBuf::from(DEFAULT_FAVORITES_FILE));
        assert_eq!(cfg.suggestion_limit, DEFAULT_SUGGESTION_LIMIT);
        assert_eq!(cfg.request_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(cfg.bind_addr.port(), 3147);
    }

    #[test]
    fn missing_or_blank_key_fails() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("OMDB_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn limit_is_clamped_and_validated() {
        let cfg = config_from(&[("OMDB_API_KEY", "k"), ("SUGGESTION_LIMIT", "500")]).unwrap();
        assert_eq!(cfg.suggestion_limit, MAX_SUGGESTION_LIMIT);
        let cfg = config_from(&[("OMDB_API_KEY", "k"), ("SUGGESTION_LIMIT", "0")]).unwrap();
        assert_eq!(cfg.suggestion_limit, 1);
        assert!(config_from(&[("OMDB_API_KEY", "k"), ("SUGGESTION_LIMIT", "six")]).is_err());
    }

    #[test]
    fn bad_timeout_falls_back_to_default() {
        let cfg = config_from(&[("OMDB_API_KEY", "k"), ("REQUEST_TIMEOUT_SECS", "0")]).unwrap();
        assert_eq!(cfg.request_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let cfg = config_from(&[("OMDB_API_KEY", "k"), ("REQUEST_TIMEOUT_SECS", "3")]).unwrap();
        assert_eq!(cfg.request_timeout, Duration::from_secs(3));
    }
}
