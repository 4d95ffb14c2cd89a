//! Error types for the cache module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the cache.
///
/// None of these fail a conversion; callers log them and carry on uncached.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem operation on the cache directory failed.
    #[error("Cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The index could not be encoded or decoded.
    #[error("Cache index error: {0}")]
    Index(#[from] serde_json::Error),

    /// The artifact alone exceeds the size cap.
    #[error("Artifact of {size_bytes} bytes exceeds cache limit of {max_bytes} bytes")]
    TooLarge { size_bytes: u64, max_bytes: u64 },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
