//! Content-addressed cache of conversion outputs.
//!
//! Entries are keyed by the SHA-256 of the source bytes plus the format pair,
//! so two files with the same content share an entry regardless of name.
//! Artifacts live under `<directory>/objects/` and the index is persisted to
//! `<directory>/index.json`. The total size is bounded with LRU eviction
//! after every store, and entries expire after a maximum age.

mod config;
mod error;
mod hashing;
mod store;
mod types;

pub use config::CacheConfig;
pub use error::CacheError;
pub use hashing::{hash_file, HASH_BUFFER_SIZE};
pub use store::ConversionCache;
pub use types::{CacheEntry, CacheKey, CacheStats, LookupOutcome, ReconcileReport};
