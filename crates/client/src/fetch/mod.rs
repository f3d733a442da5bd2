//! Live network access for the gatekeeper.
//!
//! ### Behavior
//! - Any HTTP status the server returns is a response, not an error.
//! - Only transport failures (refused connection, DNS, reset, timeout) are
//!   errors, and they surface as `Error::Network`.
//! - Bodies stream through and are cut off at `max_bytes`.
//! - No timeout unless one is configured.

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use ghoststock_core::{Body, Error, GateConfig, GateResponse, InterceptedRequest, Network, ResponseSource};
use reqwest::{Client, Method, header};

pub use url::{UrlError, canonicalize, resolve};

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "ghoststock-gate/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 10)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "ghoststock-gate/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: None,
            max_redirects: 10,
        }
    }
}

impl From<&GateConfig> for FetchConfig {
    fn from(config: &GateConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed [`Network`].
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new network client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<GateResponse, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.clone());
        if let Some(accept) = &request.accept {
            builder = builder.header(header::ACCEPT, accept);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("network error: {}", e)))?;

        let max_bytes = self.config.max_bytes;
        if let Some(len) = response.content_length()
            && len as usize > max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, max_bytes)));
        }

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        tracing::debug!(
            "fetched {} {} -> {} in {}ms",
            request.method,
            request.url,
            status,
            start.elapsed().as_millis()
        );

        let mut seen = 0usize;
        let stream = response.bytes_stream().map(move |chunk| {
            let chunk = chunk.map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;
            seen += chunk.len();
            if seen > max_bytes {
                return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", seen, max_bytes)));
            }
            Ok(chunk)
        });

        Ok(GateResponse::new(request.url.clone(), status, headers, Body::from_stream(stream), ResponseSource::Network))
    }
}
