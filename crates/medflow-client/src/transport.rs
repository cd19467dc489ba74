//! The raw HTTP seam.
//!
//! [`Transport`] sends one descriptor and returns whatever the server said.
//! It knows nothing about sessions: the cookie jar inside [`HttpTransport`]
//! carries the credentials, and the retry protocol lives in the executor.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::trace;
use url::Url;

use crate::error::{ClientError, Result};
use crate::request::{RequestDescriptor, Response};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends request descriptors over the network.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send one request. Any HTTP status is `Ok`; `Err` means no response.
    async fn send(&self, request: &RequestDescriptor) -> Result<Response>;
}

/// Shared transport for use across executors.
pub type SharedTransport = Arc<dyn Transport>;

/// `reqwest`-backed transport with a cookie store.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a new transport builder.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint against the base URL.
    pub fn url(&self, endpoint: &str) -> Result<Url> {
        let endpoint = endpoint.trim_start_matches('/');
        self.base_url.join(endpoint).map_err(ClientError::from)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response> {
        let url = self.url(request.endpoint())?;
        trace!(method = %request.method(), url = %url, "Sending request");

        let mut builder = self
            .http
            .request(request.method().into(), url)
            .timeout(self.timeout);
        if !request.query().is_empty() {
            builder = builder.query(request.query());
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        trace!(status, bytes = body.len(), "Received response");
        Ok(Response::new(status, body.to_vec()))
    }
}

/// Builder for creating an [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    base_url: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl HttpTransportBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the base URL for the backend.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<HttpTransport> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Config("base_url is required".to_string()))?;

        // Parse and normalize base URL so relative joins keep its path.
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("medflow-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .cookie_store(true)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(HttpTransport {
            http,
            base_url,
            timeout: self.timeout,
        })
    }
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
