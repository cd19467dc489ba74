//! Client error types.

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response was received (connect failure, timeout, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// The request descriptor is not fully formed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned a non-success response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code from server.
        code: String,
        /// Error message from server.
        message: String,
    },

    /// The session could not be renewed; the user must log in again.
    #[error("Session terminated")]
    SessionTerminated,

    /// Reading or writing session markers failed.
    #[error("Session marker storage error: {0}")]
    Markers(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Check if the session ended and the caller was sent to login.
    pub fn is_session_terminated(&self) -> bool {
        matches!(self, ClientError::SessionTerminated)
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, ClientError::Api { status, .. } if *status >= 500)
    }

    /// Check if no response was received.
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Network(e.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Error body returned by the backends.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}
