//! Configuration system for the medflow client core.
//!
//! Provides TOML-based configuration with:
//! - `[api]` connection settings (base URL, refresh and login paths, timeout)
//! - `[cache]` per-domain cache sizing
//! - `[session]` session marker persistence
//! - `[logging]` tracing filter and optional JSON file output
//! - `[[invalidation.rules]]` cross-domain invalidation rules as plain data
//!
//! Config files are layered: the user config directory first, then a
//! project-local `medflow.toml` on top.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options, save_config,
    user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
