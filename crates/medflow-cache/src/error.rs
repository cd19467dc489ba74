//! Error types for cache and bus operations.

use medflow_client::ClientError;

/// Error type for cache and bus operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The request executor failed (network, API status, terminated session).
    #[error(transparent)]
    Client(#[from] ClientError),

    /// An invalidation rule is malformed.
    #[error("Invalid invalidation rule: {0}")]
    InvalidRule(String),

    /// A tag string could not be parsed.
    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    /// A live store is already mounted for the domain.
    #[error("Domain already mounted: {0}")]
    DomainAlreadyMounted(String),
}

impl CacheError {
    /// Check if the underlying session was terminated.
    pub fn is_session_terminated(&self) -> bool {
        matches!(self, CacheError::Client(e) if e.is_session_terminated())
    }
}

/// Result type for cache and bus operations.
pub type Result<T> = std::result::Result<T, CacheError>;
