//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [api]                    # backend connection + session refresh
//! [cache]                  # per-domain cache sizing
//! [session]                # session marker persistence
//! [logging]                # tracing filter and file output
//! [[invalidation.rules]]   # cross-domain invalidation table
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/";

/// Default session renewal endpoint, relative to the base URL.
pub const DEFAULT_REFRESH_PATH: &str = "auth/refresh";

/// Default login entry point the UI navigates to on session termination.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of entries each domain cache holds before LRU eviction.
pub const DEFAULT_MAX_ENTRIES: usize = 512;

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "medflow=info,medflow_client=info,medflow_cache=info,warn";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedflowConfig {
    /// Backend connection settings.
    pub api: Option<ApiConfig>,

    /// Cache sizing.
    pub cache: Option<CacheConfig>,

    /// Session marker settings.
    pub session: Option<SessionConfig>,

    /// Tracing setup.
    pub logging: Option<LoggingConfig>,

    /// Cross-domain invalidation rules.
    pub invalidation: Option<InvalidationConfig>,
}

impl MedflowConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: MedflowConfig = toml::from_str(toml_str)?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections replace wholesale; invalidation rules accumulate.
    pub fn merge(&mut self, other: MedflowConfig) {
        if other.api.is_some() {
            self.api = other.api;
        }

        if other.cache.is_some() {
            self.cache = other.cache;
        }

        if other.session.is_some() {
            self.session = other.session;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }

        if let Some(other_inv) = other.invalidation {
            match self.invalidation.as_mut() {
                Some(inv) => inv.rules.extend(other_inv.rules),
                None => self.invalidation = Some(other_inv),
            }
        }
    }

    /// Effective API settings.
    pub fn api(&self) -> ApiConfig {
        self.api.clone().unwrap_or_default()
    }

    /// Effective cache settings.
    pub fn cache(&self) -> CacheConfig {
        self.cache.clone().unwrap_or_default()
    }

    /// Effective session settings.
    pub fn session(&self) -> SessionConfig {
        self.session.clone().unwrap_or_default()
    }

    /// Effective logging settings.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Configured invalidation rules (empty when the section is absent).
    pub fn rules(&self) -> &[RuleConfig] {
        self.invalidation
            .as_ref()
            .map(|inv| inv.rules.as_slice())
            .unwrap_or(&[])
    }

    /// Check values that the type system cannot.
    pub fn validate(&self) -> Result<()> {
        let api = self.api();
        if api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "api.base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if api.refresh_path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "api.refresh_path",
                reason: "must not be empty".to_string(),
            });
        }
        if api.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "api.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.cache().max_entries == 0 {
            return Err(ConfigError::Invalid {
                key: "cache.max_entries",
                reason: "must be greater than zero".to_string(),
            });
        }
        for (index, rule) in self.rules().iter().enumerate() {
            rule.validate(index)?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Backend connection settings.
///
/// ```toml
/// [api]
/// base_url = "https://hospital.example.org/api/"
/// refresh_path = "auth/refresh"
/// login_path = "/login"
/// timeout_secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint is resolved against.
    pub base_url: String,
    /// Session renewal endpoint (POST), relative to `base_url`.
    pub refresh_path: String,
    /// Login entry point used for navigation after the session ends.
    pub login_path: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Custom user agent.
    pub user_agent: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

impl ApiConfig {
    /// Request timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Per-domain cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entries held by one domain before LRU eviction.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Session marker settings.
///
/// When `markers_path` is unset the markers live only in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// JSON file holding role, display name and first-login flag.
    pub markers_path: Option<PathBuf>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive for the console layer.
    pub filter: String,
    /// Emit console output as JSON instead of human-readable text.
    pub json: bool,
    /// Directory for daily-rolling JSON log files.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
            directory: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Invalidation Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Cross-domain invalidation table.
///
/// ```toml
/// [[invalidation.rules]]
/// source_domain = "doctor"
/// source_action = "approve_recommendation"
/// target_domain = "nurse"
/// target_tag = "Recommendation"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvalidationConfig {
    /// Rules appended to the built-in table.
    pub rules: Vec<RuleConfig>,
}

/// One rule: "when `source_domain` completes `source_action`, invalidate
/// `target_tag` in `target_domain`".
///
/// `target_tag` is either a bare kind (`Recommendation`) or `kind:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub source_domain: String,
    pub source_action: String,
    pub target_domain: String,
    pub target_tag: String,
}

impl RuleConfig {
    /// Create a rule.
    pub fn new(
        source_domain: impl Into<String>,
        source_action: impl Into<String>,
        target_domain: impl Into<String>,
        target_tag: impl Into<String>,
    ) -> Self {
        Self {
            source_domain: source_domain.into(),
            source_action: source_action.into(),
            target_domain: target_domain.into(),
            target_tag: target_tag.into(),
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        let fields = [
            ("source_domain", &self.source_domain),
            ("source_action", &self.source_action),
            ("target_domain", &self.target_domain),
            ("target_tag", &self.target_tag),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidRule { index, field });
            }
        }
        Ok(())
    }
}
