//! Error types for the medflow facade.

use medflow_cache::CacheError;
use medflow_client::ClientError;
use medflow_config::ConfigError;

/// Result type alias for facade operations.
pub type Result<T> = std::result::Result<T, MedflowError>;

/// Errors surfaced by domain operations and application wiring.
#[derive(Debug, thiserror::Error)]
pub enum MedflowError {
    /// Cache or bus failure, including request failures on a miss or write.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Request layer failure outside the cache.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A response did not have the expected shape.
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        source: serde_json::Error,
    },

    /// The tracing subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Telemetry(String),
}

impl MedflowError {
    /// Check if the session ended and the user was sent to login.
    pub fn is_session_terminated(&self) -> bool {
        match self {
            MedflowError::Cache(e) => e.is_session_terminated(),
            MedflowError::Client(e) => e.is_session_terminated(),
            _ => false,
        }
    }
}
