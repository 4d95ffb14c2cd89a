//! Content-addressed store of conversion artifacts with a persisted JSON index.

use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::config::CacheConfig;
use super::error::CacheError;
use super::types::{CacheEntry, CacheKey, CacheStats, LookupOutcome, ReconcileReport};
use crate::metrics;

const INDEX_FILE: &str = "index.json";
const INDEX_TMP_FILE: &str = "index.json.tmp";
const OBJECTS_DIR: &str = "objects";

type Index = BTreeMap<String, CacheEntry>;

/// Cache of conversion outputs keyed by source content and format pair.
///
/// The index is held in memory and rewritten wholesale after every mutation.
pub struct ConversionCache {
    config: CacheConfig,
    index_path: PathBuf,
    objects_dir: PathBuf,
    index: Mutex<Index>,
}

impl ConversionCache {
    /// Opens the cache, creating its directories and loading the index.
    ///
    /// An unreadable or corrupt index is logged and replaced by an empty one.
    pub async fn open(config: CacheConfig) -> Result<Self, CacheError> {
        let objects_dir = config.directory.join(OBJECTS_DIR);
        tokio::fs::create_dir_all(&objects_dir)
            .await
            .map_err(|e| CacheError::io(&objects_dir, e))?;

        let index_path = config.directory.join(INDEX_FILE);
        let index = load_index(&index_path).await;
        let total: u64 = index.values().map(|e| e.file_size_bytes).sum();
        metrics::CACHE_BYTES.set(total as i64);

        info!(
            directory = %config.directory.display(),
            entries = index.len(),
            total_bytes = total,
            "Cache opened"
        );

        Ok(Self {
            config,
            index_path,
            objects_dir,
            index: Mutex::new(index),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the artifact path for `key` if present and fresh.
    pub async fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
        self.lookup_outcome(key).await.into_path()
    }

    /// Looks up `key`, removing the entry when it is expired or its file is gone.
    pub async fn lookup_outcome(&self, key: &CacheKey) -> LookupOutcome {
        let index_key = key.index_key();
        let mut index = self.index.lock().await;
        let now = Utc::now();

        let outcome = match index.get(&index_key) {
            None => LookupOutcome::Miss,
            Some(entry) if entry.age_ms(now) > self.config.max_age_ms => LookupOutcome::Expired,
            Some(entry) => match tokio::fs::metadata(&entry.output_path).await {
                Ok(meta) if meta.is_file() => LookupOutcome::Hit(entry.output_path.clone()),
                _ => LookupOutcome::MissingFile,
            },
        };

        match &outcome {
            LookupOutcome::Hit(_) => {
                if let Some(entry) = index.get_mut(&index_key) {
                    entry.last_accessed_at = now;
                    entry.access_count += 1;
                    debug!(key = %key, access_count = entry.access_count, "Cache hit");
                }
                self.persist_or_warn(&index).await;
            }
            LookupOutcome::Miss => debug!(key = %key, "Cache miss"),
            LookupOutcome::Expired => {
                if let Some(entry) = index.remove(&index_key) {
                    debug!(key = %key, age_ms = entry.age_ms(now), "Cache entry expired");
                    remove_artifact(&entry.output_path).await;
                }
                self.persist_or_warn(&index).await;
            }
            LookupOutcome::MissingFile => {
                if let Some(entry) = index.remove(&index_key) {
                    warn!(
                        key = %key,
                        path = %entry.output_path.display(),
                        "Cached artifact missing, dropping entry"
                    );
                }
                self.persist_or_warn(&index).await;
            }
        }

        metrics::CACHE_LOOKUPS
            .with_label_values(&[outcome.as_str()])
            .inc();
        update_bytes_gauge(&index);
        outcome
    }

    /// Moves `produced` into the object store under `key` and records it.
    ///
    /// Returns the artifact path. Evicts least-recently-used entries until
    /// the index is back under the size cap.
    pub async fn store(&self, key: &CacheKey, produced: &Path) -> Result<PathBuf, CacheError> {
        let size_bytes = tokio::fs::metadata(produced)
            .await
            .map_err(|e| CacheError::io(produced, e))?
            .len();
        if size_bytes > self.config.max_size_bytes {
            return Err(CacheError::TooLarge {
                size_bytes,
                max_bytes: self.config.max_size_bytes,
            });
        }

        let artifact = self.objects_dir.join(key.artifact_name());
        let mut index = self.index.lock().await;

        move_file(produced, &artifact).await?;

        let now = Utc::now();
        index.insert(
            key.index_key(),
            CacheEntry {
                key: key.clone(),
                output_path: artifact.clone(),
                created_at: now,
                last_accessed_at: now,
                access_count: 0,
                file_size_bytes: size_bytes,
            },
        );
        debug!(key = %key, size_bytes, "Stored cache entry");

        let evicted = self.evict_locked(&mut index).await;
        if evicted > 0 {
            info!(evicted, "Evicted cache entries after store");
        }

        self.persist_or_warn(&index).await;
        update_bytes_gauge(&index);
        Ok(artifact)
    }

    /// Removes least-recently-accessed entries until under the size cap.
    ///
    /// Returns the number of entries evicted.
    pub async fn evict(&self) -> usize {
        let mut index = self.index.lock().await;
        let evicted = self.evict_locked(&mut index).await;
        if evicted > 0 {
            self.persist_or_warn(&index).await;
            update_bytes_gauge(&index);
        }
        evicted
    }

    /// Removes one entry and its artifact. Returns whether it existed.
    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        let mut index = self.index.lock().await;
        let Some(entry) = index.remove(&key.index_key()) else {
            return false;
        };
        remove_artifact(&entry.output_path).await;
        debug!(key = %key, "Invalidated cache entry");
        self.persist_or_warn(&index).await;
        update_bytes_gauge(&index);
        true
    }

    /// Removes every entry and artifact. Returns the number of entries removed.
    pub async fn clear(&self) -> Result<usize, CacheError> {
        let mut index = self.index.lock().await;
        let removed = index.len();
        for entry in index.values() {
            remove_artifact(&entry.output_path).await;
        }
        index.clear();
        self.persist(&index).await?;
        update_bytes_gauge(&index);
        info!(removed, "Cache cleared");
        Ok(removed)
    }

    /// Drops every expired entry. Returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        let mut index = self.index.lock().await;
        let now = Utc::now();
        let expired: Vec<String> = index
            .iter()
            .filter(|(_, entry)| entry.age_ms(now) > self.config.max_age_ms)
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired {
            if let Some(entry) = index.remove(key) {
                remove_artifact(&entry.output_path).await;
            }
        }

        if !expired.is_empty() {
            debug!(purged = expired.len(), "Purged expired cache entries");
            self.persist_or_warn(&index).await;
            update_bytes_gauge(&index);
        }
        expired.len()
    }

    /// Current occupancy.
    pub async fn stats(&self) -> CacheStats {
        let index = self.index.lock().await;
        let total_bytes: u64 = index.values().map(|e| e.file_size_bytes).sum();
        let max_bytes = self.config.max_size_bytes;
        let utilization_percent = if max_bytes == 0 {
            0.0
        } else {
            total_bytes as f64 / max_bytes as f64 * 100.0
        };
        CacheStats {
            entries: index.len(),
            total_bytes,
            max_bytes,
            utilization_percent,
        }
    }

    /// Deletes unreferenced files in the object store and drops entries
    /// whose artifact is gone.
    pub async fn reconcile(&self) -> Result<ReconcileReport, CacheError> {
        let mut index = self.index.lock().await;
        let mut report = ReconcileReport::default();

        let dangling: Vec<String> = {
            let mut missing = Vec::new();
            for (key, entry) in index.iter() {
                if tokio::fs::metadata(&entry.output_path).await.is_err() {
                    missing.push(key.clone());
                }
            }
            missing
        };
        for key in &dangling {
            index.remove(key);
        }
        report.dangling_entries_removed = dangling.len();

        let referenced: HashSet<&Path> = index.values().map(|e| e.output_path.as_path()).collect();
        let mut dir = tokio::fs::read_dir(&self.objects_dir)
            .await
            .map_err(|e| CacheError::io(&self.objects_dir, e))?;
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::io(&self.objects_dir, e))?
        {
            let path = item.path();
            if referenced.contains(path.as_path()) {
                continue;
            }
            let size = item.metadata().await.map(|m| m.len()).unwrap_or(0);
            let removed = match item.file_type().await {
                Ok(ft) if ft.is_dir() => tokio::fs::remove_dir_all(&path).await,
                _ => tokio::fs::remove_file(&path).await,
            };
            match removed {
                Ok(()) => {
                    report.orphaned_files_removed += 1;
                    report.bytes_reclaimed += size;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove orphaned file"),
            }
        }

        if report.dangling_entries_removed > 0 {
            self.persist(&index).await?;
        }
        update_bytes_gauge(&index);

        info!(
            orphaned_files_removed = report.orphaned_files_removed,
            dangling_entries_removed = report.dangling_entries_removed,
            bytes_reclaimed = report.bytes_reclaimed,
            "Cache reconciled"
        );
        Ok(report)
    }

    async fn evict_locked(&self, index: &mut Index) -> usize {
        let mut total: u64 = index.values().map(|e| e.file_size_bytes).sum();
        let mut evicted = 0;

        while total > self.config.max_size_bytes {
            let lru = index
                .iter()
                .min_by(|(ka, a), (kb, b)| {
                    a.last_accessed_at
                        .cmp(&b.last_accessed_at)
                        .then_with(|| ka.cmp(kb))
                })
                .map(|(k, _)| k.clone());
            let Some(key) = lru else { break };
            let Some(entry) = index.remove(&key) else { break };

            remove_artifact(&entry.output_path).await;
            total = total.saturating_sub(entry.file_size_bytes);
            evicted += 1;
            metrics::CACHE_EVICTIONS.inc();
            debug!(key = %key, size_bytes = entry.file_size_bytes, "Evicted cache entry");
        }

        evicted
    }

    /// Writes the index atomically via a temporary file.
    async fn persist(&self, index: &Index) -> Result<(), CacheError> {
        let json = serde_json::to_vec_pretty(index)?;
        let tmp = self.config.directory.join(INDEX_TMP_FILE);
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| CacheError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.index_path)
            .await
            .map_err(|e| CacheError::io(&self.index_path, e))?;
        Ok(())
    }

    async fn persist_or_warn(&self, index: &Index) {
        if let Err(e) = self.persist(index).await {
            warn!(error = %e, "Failed to persist cache index");
        }
    }
}

async fn load_index(path: &Path) -> Index {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Index::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read cache index, starting empty");
            return Index::new();
        }
    };

    match serde_json::from_slice::<Index>(&bytes) {
        Ok(index) => index,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt cache index, starting empty");
            Index::new()
        }
    }
}

/// Renames, falling back to copy and delete across filesystems.
async fn move_file(from: &Path, to: &Path) -> Result<(), CacheError> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to)
        .await
        .map_err(|e| CacheError::io(to, e))?;
    if let Err(e) = tokio::fs::remove_file(from).await {
        debug!(path = %from.display(), error = %e, "Failed to remove moved source");
    }
    Ok(())
}

/// Deleting an artifact is best effort; reconcile picks up leftovers.
async fn remove_artifact(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to delete cached artifact");
        }
    }
}

fn update_bytes_gauge(index: &Index) {
    let total: u64 = index.values().map(|e| e.file_size_bytes).sum();
    metrics::CACHE_BYTES.set(total as i64);
}
