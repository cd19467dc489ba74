//! Request descriptors and raw responses.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, ErrorResponse, Result};

/// HTTP method of a request descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One outbound call: endpoint, method, query parameters and a
/// pre-serialized body.
///
/// Constructed through the builder-style methods and never mutated after it
/// is handed to the executor, which may replay it once after a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: Method,
    endpoint: String,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl RequestDescriptor {
    /// Create a descriptor for `endpoint`, relative to the transport's base URL.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Post, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Put, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Patch, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Delete, endpoint)
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Attach an already-serialized body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `body` as JSON and attach it.
    pub fn with_json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self> {
        let bytes = serde_json::to_vec(body)?;
        Ok(self.with_body(bytes))
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Reject descriptors that are not fully formed.
    ///
    /// The endpoint must be non-empty and relative: the session cookies are
    /// scoped to the configured backend, so absolute URLs are refused.
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() || endpoint == "/" {
            return Err(ClientError::InvalidRequest(
                "endpoint must not be empty".to_string(),
            ));
        }
        if endpoint.contains("://") {
            return Err(ClientError::InvalidRequest(format!(
                "endpoint '{}' must be relative to the base URL",
                self.endpoint
            )));
        }
        if endpoint.chars().any(char::is_whitespace) {
            return Err(ClientError::InvalidRequest(format!(
                "endpoint '{}' contains whitespace",
                self.endpoint
            )));
        }
        Ok(())
    }

    /// Stable cache key: method, endpoint and sorted query parameters.
    pub fn cache_key(&self) -> String {
        let endpoint = self.endpoint.trim_start_matches('/');
        if self.query.is_empty() {
            return format!("{} {}", self.method, endpoint);
        }
        // Stable sort by key: repeated keys keep their relative order.
        let mut params: Vec<&(String, String)> = self.query.iter().collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();
        format!("{} {}?{}", self.method, endpoint, encoded)
    }
}

/// Raw response as returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Build a response with a JSON body.
    pub fn json_body(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The only status that triggers a session refresh.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON. An empty body decodes as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn a non-success response into [`ClientError::Api`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let status = self.status;
        match serde_json::from_slice::<ErrorResponse>(&self.body) {
            Ok(err) => Err(ClientError::Api {
                status,
                code: err.code.unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            }),
            Err(_) => Err(ClientError::Api {
                status,
                code: "unknown".to_string(),
                message: format!("HTTP {}", status),
            }),
        }
    }
}
