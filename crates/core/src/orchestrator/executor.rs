//! Task executor that runs the converter and files the product in the cache.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{CacheKey, ConversionCache};
use crate::converter::{ConversionJob, Converter};
use crate::processor::{ConversionTask, TaskExecutor, TaskFailure};

/// Runs a task through the converter, then moves the output into the cache.
pub struct CachingExecutor {
    converter: Arc<dyn Converter>,
    cache: Arc<ConversionCache>,
}

impl CachingExecutor {
    pub fn new(converter: Arc<dyn Converter>, cache: Arc<ConversionCache>) -> Self {
        Self { converter, cache }
    }
}

#[async_trait]
impl TaskExecutor for CachingExecutor {
    async fn execute(
        &self,
        task: &ConversionTask,
        cancel: CancellationToken,
    ) -> Result<PathBuf, TaskFailure> {
        let payload = &task.payload;
        let job = ConversionJob {
            job_id: task.id.clone(),
            input_path: payload.source_path.clone(),
            output_path: payload.output_path.clone(),
            source_format: payload.source_format,
            target_format: payload.target_format,
        };

        let outcome = self
            .converter
            .convert_cancellable(job, cancel)
            .await
            .map_err(|e| TaskFailure::new(e.kind(), e.detailed_message()))?;

        let hash = match &payload.content_hash {
            Some(hash) if self.cache.config().enabled => hash,
            _ => return Ok(outcome.output_path),
        };

        let key = CacheKey::new(hash.clone(), payload.source_format, payload.target_format);
        match self.cache.store(&key, &outcome.output_path).await {
            Ok(artifact) => {
                debug!(task_id = %task.id, key = %key, "Conversion output cached");
                Ok(artifact)
            }
            Err(e) => {
                // Serve the uncached product rather than failing the task
                warn!(task_id = %task.id, key = %key, error = %e, "Failed to cache conversion output");
                Ok(outcome.output_path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::converter::{ConversionKind, ErrorKind, Format};
    use crate::processor::TaskPayload;
    use crate::testing::MockConverter;
    use tempfile::TempDir;

    async fn setup(dir: &TempDir, enabled: bool) -> (Arc<MockConverter>, Arc<ConversionCache>) {
        let cache = ConversionCache::open(
            CacheConfig::default()
                .with_directory(dir.path().join("cache"))
                .with_enabled(enabled),
        )
        .await
        .unwrap();
        (Arc::new(MockConverter::new()), Arc::new(cache))
    }

    fn task(dir: &TempDir, hash: Option<&str>) -> ConversionTask {
        let source = dir.path().join("a.docx");
        std::fs::write(&source, b"docx bytes").unwrap();
        ConversionTask::new(
            "t-1".to_string(),
            ConversionKind::Document,
            TaskPayload {
                source_path: source,
                output_path: dir.path().join("work").join("t-1.pdf"),
                source_format: Format::Docx,
                target_format: Format::Pdf,
                content_hash: hash.map(str::to_string),
            },
        )
    }

    #[tokio::test]
    async fn test_output_moves_into_cache() {
        let dir = TempDir::new().unwrap();
        let (converter, cache) = setup(&dir, true).await;
        let executor = CachingExecutor::new(converter.clone(), cache.clone());

        let path = executor
            .execute(&task(&dir, Some("h1")), CancellationToken::new())
            .await
            .unwrap();

        assert!(path.starts_with(dir.path().join("cache")));
        assert!(path.exists());
        assert_eq!(converter.conversion_count().await, 1);
        let key = CacheKey::new("h1", Format::Docx, Format::Pdf);
        assert_eq!(cache.lookup(&key).await, Some(path));
    }

    #[tokio::test]
    async fn test_disabled_cache_keeps_work_output() {
        let dir = TempDir::new().unwrap();
        let (converter, cache) = setup(&dir, false).await;
        let executor = CachingExecutor::new(converter, cache.clone());

        let path = executor
            .execute(&task(&dir, Some("h1")), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("work").join("t-1.pdf"));
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_converter_error_maps_to_failure() {
        let dir = TempDir::new().unwrap();
        let (converter, cache) = setup(&dir, true).await;
        converter
            .set_next_error(crate::converter::ConverterError::Timeout { timeout_ms: 5 })
            .await;
        let executor = CachingExecutor::new(converter, cache.clone());

        let failure = executor
            .execute(&task(&dir, Some("h1")), CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.kind, ErrorKind::ConversionTimeout);
        assert_eq!(cache.stats().await.entries, 0);
    }
}
