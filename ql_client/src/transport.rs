use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use reqwest::ClientBuilder;
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::descriptor::AuthLevel;
use crate::descriptor::RequestDescriptor;

const API_KEY_HEADER: &str = "X-MBX-APIKEY";

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// What the pipeline sees of a completed round trip
///
/// Nothing beyond success/failure and the raw header list is interpreted
/// here; HTTP semantics stay inside the transport.
#[derive(Debug, Clone)]
pub struct TransportReply {
    pub success: bool,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

/// Transport collaborator performing the actual round trip
///
/// Timeouts are the transport's responsibility; a timed-out call surfaces
/// as an ordinary transport failure.
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a RequestDescriptor,
        cancel: &'a CancelToken,
    ) -> Pin<Box<dyn Future<Output = Result<TransportReply, TransportError>> + Send + 'a>>;
}

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum idle connections per host (default: 50)
    pub pool_max_idle_per_host: usize,

    /// Idle timeout for pooled connections (default: 90s)
    pub pool_idle_timeout: Duration,

    /// Connection establishment timeout (default: 10s)
    pub connect_timeout: Duration,

    /// Total request timeout (default: 30s)
    pub request_timeout: Duration,

    /// TCP keepalive interval (default: 60s)
    pub tcp_keepalive: Duration,

    /// Enable TCP_NODELAY (default: true)
    pub tcp_nodelay: bool,

    /// HTTP/2 adaptive window sizing (default: true)
    pub http2_adaptive_window: bool,

    /// HTTP/2 keep-alive interval (default: 30s)
    pub http2_keep_alive_interval: Duration,

    /// HTTP/2 keep-alive timeout (default: 20s)
    pub http2_keep_alive_timeout: Duration,

    /// Enable Hickory DNS for async resolution (default: true)
    pub hickory_dns: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 50,
            pool_idle_timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            tcp_keepalive: Duration::from_secs(60),
            tcp_nodelay: true,
            http2_adaptive_window: true,
            http2_keep_alive_interval: Duration::from_secs(30),
            http2_keep_alive_timeout: Duration::from_secs(20),
            hickory_dns: true,
        }
    }
}

impl TransportConfig {
    /// Configuration with shorter timeouts
    pub fn low_latency() -> Self {
        Self {
            pool_max_idle_per_host: 10,
            pool_idle_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            tcp_keepalive: Duration::from_secs(30),
            tcp_nodelay: true,
            http2_adaptive_window: true,
            http2_keep_alive_interval: Duration::from_secs(20),
            http2_keep_alive_timeout: Duration::from_secs(10),
            hickory_dns: true,
        }
    }
}

/// Production transport over a pooled reqwest client
pub struct HttpTransport {
    client: Client,
    api_key: Option<String>,
}

impl HttpTransport {
    /// Create a transport with default configuration
    pub fn new() -> Result<Self, TransportError> {
        Self::with_config(TransportConfig::default())
    }

    /// Create a transport with custom configuration
    pub fn with_config(config: TransportConfig) -> Result<Self, TransportError> {
        let builder = ClientBuilder::new()
            // Connection pooling
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            // TCP optimization
            .tcp_nodelay(config.tcp_nodelay)
            .tcp_keepalive(Some(config.tcp_keepalive))
            // Timeouts
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            // TLS with rustls
            .use_rustls_tls()
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            // HTTP/2 optimization
            .http2_adaptive_window(config.http2_adaptive_window)
            .http2_keep_alive_interval(Some(config.http2_keep_alive_interval))
            .http2_keep_alive_timeout(config.http2_keep_alive_timeout)
            // Compression
            .gzip(true)
            .brotli(true)
            .hickory_dns(config.hickory_dns);

        let client = builder.build()?;

        Ok(Self { client, api_key: None })
    }

    /// Attach an API key for endpoints above `AuthLevel::Public`
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl Transport for HttpTransport {
    fn send<'a>(
        &'a self,
        request: &'a RequestDescriptor,
        _cancel: &'a CancelToken,
    ) -> Pin<Box<dyn Future<Output = Result<TransportReply, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = self.client.request(request.method.as_reqwest(), request.url()).query(&request.params);

            if request.auth != AuthLevel::Public {
                match &self.api_key {
                    Some(key) => builder = builder.header(API_KEY_HEADER, key),
                    None => return Err(TransportError::InvalidRequest("endpoint requires an API key".to_string())),
                }
            }

            let response = builder.send().await?;
            let success = response.status().is_success();

            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
                .collect();

            let body = response.bytes().await?.to_vec();

            Ok(TransportReply { success, body, headers })
        })
    }
}
