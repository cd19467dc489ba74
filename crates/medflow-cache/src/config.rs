//! Configuration for a domain cache store.

/// Default maximum number of entries per domain.
pub const DEFAULT_MAX_ENTRIES: usize = 512;

/// Configuration for one domain's cache store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of entries before LRU eviction.
    pub max_entries: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of entries.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }
}
