//! Conversion orchestrator implementation.
//!
//! Drives a conversion request through the components:
//! - Hash the source (fails fast if it cannot be read)
//! - Consult the cache; a hit completes without touching the queue
//! - On a miss, enqueue a task whose executor converts and caches the output

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::cache::{hash_file, CacheKey, CacheStats, ConversionCache, ReconcileReport};
use crate::config::Config;
use crate::converter::{supported_conversions, Converter, ConverterError, ErrorKind, Format, ToolRoute};
use crate::metrics;
use crate::processor::{
    ConversionTask, QueueStats, Subscription, TaskEvent, TaskId, TaskPayload, TaskQueue,
};

use super::executor::CachingExecutor;
use super::types::{ConversionResult, OrchestratorError};

/// The conversion orchestrator - the only entry point callers need.
pub struct ConversionOrchestrator {
    converter: Arc<dyn Converter>,
    cache: Arc<ConversionCache>,
    queue: TaskQueue,
    work_dir: PathBuf,
    // Keeps the metrics observer registered for the orchestrator's lifetime
    _metrics_subscription: Subscription,
}

impl ConversionOrchestrator {
    /// Create a new orchestrator.
    ///
    /// Opens the cache (sweeping orphaned artifacts), prepares the work
    /// directory and starts an empty queue.
    pub async fn new(
        config: &Config,
        converter: Arc<dyn Converter>,
    ) -> Result<Self, OrchestratorError> {
        let cache = Arc::new(ConversionCache::open(config.cache.clone()).await?);
        match cache.reconcile().await {
            Ok(report) if report.orphaned_files_removed + report.dangling_entries_removed > 0 => {
                info!(
                    orphaned_files = report.orphaned_files_removed,
                    dangling_entries = report.dangling_entries_removed,
                    bytes_reclaimed = report.bytes_reclaimed,
                    "Cache reconciled at startup"
                );
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Cache reconciliation failed at startup"),
        }

        let work_dir = config.converter.work_dir.clone();
        tokio::fs::create_dir_all(&work_dir).await?;

        let executor = Arc::new(CachingExecutor::new(converter.clone(), cache.clone()));
        let queue = TaskQueue::new(config.processor.clone(), executor);
        let metrics_subscription = queue.subscribe(record_conversion_metric);

        info!(
            converter = converter.name(),
            max_concurrent = config.processor.max_concurrent_tasks,
            cache_enabled = config.cache.enabled,
            work_dir = %work_dir.display(),
            "Conversion orchestrator ready"
        );

        Ok(Self {
            converter,
            cache,
            queue,
            work_dir,
            _metrics_subscription: metrics_subscription,
        })
    }

    /// Converts a file and waits for the outcome.
    ///
    /// Never returns an error: failures, including rejected requests, are
    /// reported in the result.
    pub async fn convert(
        &self,
        source: impl AsRef<Path>,
        source_format: &str,
        target_format: &str,
    ) -> ConversionResult {
        let start = Instant::now();
        let elapsed_ms = || start.elapsed().as_millis() as u64;

        let id = match self
            .submit_conversion(source, source_format, target_format)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                let kind = e.kind().unwrap_or(ErrorKind::Internal);
                return ConversionResult::rejected(kind, e.to_string(), elapsed_ms());
            }
        };

        match self.get_result(&id).await {
            // Wall-clock time of the whole attempt, including any queue wait
            Ok(result) => result.with_duration_ms(elapsed_ms()),
            Err(e) => ConversionResult::rejected(ErrorKind::Internal, e.to_string(), elapsed_ms()),
        }
    }

    /// Validates and enqueues a conversion, returning its task id.
    ///
    /// Unsupported format pairs and unreadable sources are rejected here and
    /// never reach the queue. A cache hit is recorded as an already completed
    /// task.
    pub async fn submit_conversion(
        &self,
        source: impl AsRef<Path>,
        source_format: &str,
        target_format: &str,
    ) -> Result<TaskId, OrchestratorError> {
        let source = source.as_ref();
        let source_format: Format = source_format.parse()?;
        let target_format: Format = target_format.parse()?;
        let route = ToolRoute::resolve(source_format, target_format)?;

        let content_hash = hash_file(source)
            .await
            .map_err(|e| ConverterError::source_unreadable(source, e.to_string()))?;

        let id = TaskQueue::new_task_id();
        let payload = TaskPayload {
            source_path: source.to_path_buf(),
            output_path: self
                .work_dir
                .join(format!("{}.{}", id, target_format.extension())),
            source_format,
            target_format,
            content_hash: Some(content_hash.clone()),
        };

        if self.cache.config().enabled {
            let key = CacheKey::new(content_hash, source_format, target_format);
            if let Some(cached) = self.cache.lookup(&key).await {
                info!(task_id = %id, key = %key, "Serving conversion from cache");
                self.queue
                    .record_completed(id.clone(), route.kind, payload, cached, true)
                    .await;
                return Ok(id);
            }
        }

        debug!(
            task_id = %id,
            source = %source.display(),
            source_format = %source_format,
            target_format = %target_format,
            tool = route.tool.name(),
            "Submitting conversion"
        );
        Ok(self.queue.submit_with_id(id, route.kind, payload).await)
    }

    /// Current snapshot of a task.
    pub async fn get_status(&self, id: &str) -> Result<ConversionTask, OrchestratorError> {
        self.queue
            .status(id)
            .await
            .ok_or_else(|| OrchestratorError::TaskNotFound(id.to_string()))
    }

    /// Waits for a task to finish and returns its result.
    pub async fn get_result(&self, id: &str) -> Result<ConversionResult, OrchestratorError> {
        let task = self.queue.wait(id).await?;
        Ok(ConversionResult::from_task(&task))
    }

    /// Cancels a pending or processing task.
    pub async fn cancel(&self, id: &str) -> Result<ConversionTask, OrchestratorError> {
        Ok(self.queue.cancel(id).await?)
    }

    /// Registers a task lifecycle observer. Dropping the handle unsubscribes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&TaskEvent) + Send + Sync + 'static,
    {
        self.queue.subscribe(callback)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Removes every cached artifact. Returns the number of entries dropped.
    pub async fn clear_cache(&self) -> Result<usize, OrchestratorError> {
        Ok(self.cache.clear().await?)
    }

    pub async fn reconcile_cache(&self) -> Result<ReconcileReport, OrchestratorError> {
        Ok(self.cache.reconcile().await?)
    }

    pub async fn purge_expired_cache(&self) -> usize {
        self.cache.purge_expired().await
    }

    pub async fn processor_stats(&self) -> QueueStats {
        self.queue.stats().await
    }

    pub fn supported_conversions(&self) -> Vec<ToolRoute> {
        supported_conversions()
    }

    pub fn converter(&self) -> &Arc<dyn Converter> {
        &self.converter
    }

    pub fn cache(&self) -> &Arc<ConversionCache> {
        &self.cache
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }
}

fn record_conversion_metric(event: &TaskEvent) {
    let task = event.task();
    let result = match event {
        TaskEvent::Completed(_) if task.cache_hit => "cache_hit",
        TaskEvent::Completed(_) => "success",
        TaskEvent::Failed(_) => task
            .error_kind
            .map(|kind| kind.as_str())
            .unwrap_or("internal"),
        TaskEvent::Cancelled(_) => "cancelled",
        TaskEvent::Added(_) | TaskEvent::Started(_) => return,
    };
    metrics::CONVERSIONS_TOTAL.with_label_values(&[result]).inc();
}
