//! Types for the cache module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::converter::Format;

/// Identity of a cached conversion: source bytes plus format pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Hex SHA-256 of the source file.
    pub content_hash: String,
    pub source_format: Format,
    pub target_format: Format,
}

impl CacheKey {
    pub fn new(content_hash: impl Into<String>, source_format: Format, target_format: Format) -> Self {
        Self {
            content_hash: content_hash.into(),
            source_format,
            target_format,
        }
    }

    /// Key used in the persisted index.
    pub fn index_key(&self) -> String {
        format!(
            "{}_{}_{}",
            self.content_hash, self.source_format, self.target_format
        )
    }

    /// File name of the artifact inside the object store.
    pub fn artifact_name(&self) -> String {
        format!(
            "{}_{}.{}",
            self.content_hash,
            self.source_format,
            self.target_format.extension()
        )
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.index_key())
    }
}

/// One record of the cache index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(flatten)]
    pub key: CacheKey,
    /// Location of the artifact.
    pub output_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u64,
    pub file_size_bytes: u64,
}

impl CacheEntry {
    /// Age in milliseconds at `now`; zero if the clock went backwards.
    pub fn age_ms(&self, now: DateTime<Utc>) -> u64 {
        (now - self.created_at).num_milliseconds().max(0) as u64
    }
}

/// What a lookup found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Artifact present and fresh.
    Hit(PathBuf),
    /// No entry for the key.
    Miss,
    /// Entry older than the configured maximum age; removed.
    Expired,
    /// Entry present but its artifact is gone; removed.
    MissingFile,
}

impl LookupOutcome {
    /// Label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit(_) => "hit",
            Self::Miss => "miss",
            Self::Expired => "expired",
            Self::MissingFile => "missing_file",
        }
    }

    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Self::Hit(path) => Some(path),
            _ => None,
        }
    }
}

/// Cache occupancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
    pub max_bytes: u64,
    pub utilization_percent: f64,
}

/// Result of comparing the object store with the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Files in the object store no entry referenced.
    pub orphaned_files_removed: usize,
    /// Entries whose artifact had disappeared.
    pub dangling_entries_removed: usize,
    pub bytes_reclaimed: u64,
}
