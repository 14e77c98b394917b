use std::path::Path;
use std::time::Duration;

use config::Config;
use config::ConfigError;
use config::File;
use serde::Deserialize;

use crate::transport::HttpTransport;
use crate::transport::TransportConfig;
use crate::transport::TransportError;

const DEFAULT_BASE_URL: &str = "https://api.binance.com";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_pool_max_idle_per_host() -> usize {
    50
}

/// File-backed client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key for authenticated endpoint families
    pub api_key: Option<String>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
        }
    }
}

impl ClientConfig {
    /// Transport settings derived from this configuration
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            pool_max_idle_per_host: self.pool_max_idle_per_host,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            ..TransportConfig::default()
        }
    }

    /// Build the production transport, attaching the API key when present
    pub fn build_transport(&self) -> Result<HttpTransport, TransportError> {
        let transport = HttpTransport::with_config(self.transport())?;
        match &self.api_key {
            Some(key) => Ok(transport.with_api_key(key.clone())),
            None => Ok(transport),
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let config = Config::builder().add_source(File::from(path.as_ref())).build()?;

    config.try_deserialize()
}

/// Load client config with fallback to default
pub fn load_config_or_default(path: &str) -> ClientConfig {
    match load_config(path) {
        Ok(config) => {
            tracing::info!("Loaded client config from {path}");
            config
        }
        Err(err) => {
            tracing::warn!("Failed to load client config from {}: {}. Using defaults.", path, err);
            ClientConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.api_key.is_none());
        assert_eq!(config.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_transport_derivation() {
        let config = ClientConfig { connect_timeout_ms: 5_000, ..Default::default() };
        let transport = config.transport();
        assert_eq!(transport.connect_timeout, Duration::from_millis(5_000));
        assert_eq!(transport.pool_max_idle_per_host, 50);
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let config = load_config_or_default("/nonexistent/client.toml");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_build_transport() {
        let config = ClientConfig { api_key: Some("key".to_string()), ..Default::default() };
        assert!(config.build_transport().is_ok());
    }
}
