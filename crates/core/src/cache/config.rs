//! Configuration for the conversion cache.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the content-addressed cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Disable to always run the tool.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Directory holding `index.json` and the `objects/` store.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Upper bound on the bytes referenced by the index.
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,

    /// Entries older than this are treated as absent.
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_directory() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_max_size_bytes() -> u64 {
    1024 * 1024 * 1024
}

fn default_max_age_ms() -> u64 {
    24 * 60 * 60 * 1000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            directory: default_directory(),
            max_size_bytes: default_max_size_bytes(),
            max_age_ms: default_max_age_ms(),
        }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }

    /// Sets the cache directory.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Sets the size cap.
    pub fn with_max_size_bytes(mut self, max_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    /// Sets the maximum entry age.
    pub fn with_max_age_ms(mut self, max_age_ms: u64) -> Self {
        self.max_age_ms = max_age_ms;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
