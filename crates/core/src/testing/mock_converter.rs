//! Mock converter for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::converter::{ConversionJob, Converter, ConverterError, ToolOutcome, ToolRoute};

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The job that was submitted.
    pub job: ConversionJob,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Routes and validates jobs like the real converter, but instead of running
/// a tool it sleeps for the configured duration and writes a small file to
/// the output path.
///
/// Provides controllable behavior for testing:
/// - Track conversion jobs for assertions
/// - Simulate failures
/// - Simulate slow tools (and cancellation while they run)
///
/// # Example
///
/// ```rust,ignore
/// use filemill_core::testing::MockConverter;
///
/// let converter = MockConverter::new();
/// converter.set_conversion_duration(Duration::from_millis(50)).await;
///
/// let outcome = converter.convert(job).await?;
///
/// assert_eq!(converter.conversion_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockConverter {
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// If set, the next conversion will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Simulated conversion duration in milliseconds.
    conversion_duration_ms: Arc<RwLock<u64>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            conversions: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            conversion_duration_ms: Arc::new(RwLock::new(10)),
        }
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Clear recorded conversions.
    pub async fn clear_recorded(&self) {
        self.conversions.write().await.clear();
    }

    /// Get the number of conversions attempted.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Configure the next conversion to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Clear any pending error.
    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    /// Set the simulated conversion duration.
    pub async fn set_conversion_duration(&self, duration: Duration) {
        *self.conversion_duration_ms.write().await = duration.as_millis() as u64;
    }

    async fn record(&self, job: ConversionJob, success: bool) {
        self.conversions
            .write()
            .await
            .push(RecordedConversion { job, success });
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert_cancellable(
        &self,
        job: ConversionJob,
        cancel: CancellationToken,
    ) -> Result<ToolOutcome, ConverterError> {
        let start = Instant::now();
        let route = ToolRoute::resolve(job.source_format, job.target_format)?;

        if tokio::fs::metadata(&job.input_path).await.is_err() {
            return Err(ConverterError::source_unreadable(&job.input_path, "not found"));
        }

        if let Some(err) = self.next_error.write().await.take() {
            self.record(job, false).await;
            return Err(err);
        }

        // Simulate the tool running
        let duration_ms = *self.conversion_duration_ms.read().await;
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(duration_ms)) => {}
            _ = cancel.cancelled() => {
                self.record(job, false).await;
                return Err(ConverterError::Cancelled);
            }
        }

        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = format!(
            "{} -> {}\n",
            job.input_path.display(),
            job.target_format
        );
        tokio::fs::write(&job.output_path, body.as_bytes()).await?;

        self.record(job.clone(), true).await;

        Ok(ToolOutcome {
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes: body.len() as u64,
            duration_ms: start.elapsed().as_millis() as u64,
            tool: route.tool,
        })
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{Format, ToolKind};
    use tempfile::TempDir;

    fn create_test_job(dir: &TempDir, id: &str) -> ConversionJob {
        let input = dir.path().join("input.docx");
        std::fs::write(&input, b"docx").unwrap();
        ConversionJob {
            job_id: id.to_string(),
            input_path: input,
            output_path: dir.path().join("out").join(format!("{}.pdf", id)),
            source_format: Format::Docx,
            target_format: Format::Pdf,
        }
    }

    #[tokio::test]
    async fn test_basic_conversion() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();

        let outcome = converter
            .convert(create_test_job(&dir, "test-1"))
            .await
            .unwrap();

        assert_eq!(outcome.job_id, "test-1");
        assert_eq!(outcome.tool, ToolKind::LibreOffice);
        assert!(outcome.output_path.exists());
    }

    #[tokio::test]
    async fn test_recorded_conversions() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        converter.set_conversion_duration(Duration::ZERO).await;

        converter.convert(create_test_job(&dir, "job-1")).await.unwrap();
        converter.convert(create_test_job(&dir, "job-2")).await.unwrap();

        let conversions = converter.recorded_conversions().await;
        assert_eq!(conversions.len(), 2);
        assert!(conversions[0].success);
        assert_eq!(conversions[0].job.job_id, "job-1");
    }

    #[tokio::test]
    async fn test_error_injection() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        converter
            .set_next_error(ConverterError::Timeout { timeout_ms: 5 })
            .await;

        let result = converter.convert(create_test_job(&dir, "fail")).await;
        assert!(matches!(result, Err(ConverterError::Timeout { .. })));

        // Error should be consumed, conversion recorded as failed
        let conversions = converter.recorded_conversions().await;
        assert_eq!(conversions.len(), 1);
        assert!(!conversions[0].success);
        assert!(converter.convert(create_test_job(&dir, "ok")).await.is_ok());
    }

    #[tokio::test]
    async fn test_unsupported_pair_is_not_recorded() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        let mut job = create_test_job(&dir, "bad");
        job.target_format = Format::Png;

        let err = converter.convert(job).await.unwrap_err();
        assert!(matches!(err, ConverterError::UnsupportedConversion { .. }));
        assert_eq!(converter.conversion_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancellation() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        converter
            .set_conversion_duration(Duration::from_secs(10))
            .await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = converter
            .convert_cancellable(create_test_job(&dir, "c"), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::Cancelled));
    }
}
