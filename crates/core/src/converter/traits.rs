//! Trait definitions for the converter module.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::ConverterError;
use super::routes::{self, ToolRoute};
use super::types::{ConversionJob, Format, ToolOutcome};

/// Something that turns a source file into a file of another format.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Converts a file as described by the job.
    async fn convert(&self, job: ConversionJob) -> Result<ToolOutcome, ConverterError> {
        self.convert_cancellable(job, CancellationToken::new()).await
    }

    /// Converts a file, aborting with `Cancelled` once `cancel` fires.
    ///
    /// Implementations must stop any external process they started before
    /// returning.
    async fn convert_cancellable(
        &self,
        job: ConversionJob,
        cancel: CancellationToken,
    ) -> Result<ToolOutcome, ConverterError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;

    /// Whether a route exists for the format pair.
    fn supports(&self, source: Format, target: Format) -> bool {
        ToolRoute::resolve(source, target).is_ok()
    }

    /// Every conversion this converter can perform.
    fn supported_conversions(&self) -> Vec<ToolRoute> {
        routes::supported_conversions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct EchoConverter;

    #[async_trait]
    impl Converter for EchoConverter {
        fn name(&self) -> &str {
            "echo"
        }

        async fn convert_cancellable(
            &self,
            job: ConversionJob,
            cancel: CancellationToken,
        ) -> Result<ToolOutcome, ConverterError> {
            if cancel.is_cancelled() {
                return Err(ConverterError::Cancelled);
            }
            let route = ToolRoute::resolve(job.source_format, job.target_format)?;
            Ok(ToolOutcome {
                job_id: job.job_id,
                output_path: job.output_path,
                output_size_bytes: 0,
                duration_ms: 0,
                tool: route.tool,
            })
        }

        async fn validate(&self) -> Result<(), ConverterError> {
            Ok(())
        }
    }

    fn job(source: Format, target: Format) -> ConversionJob {
        ConversionJob {
            job_id: "test-job".to_string(),
            input_path: PathBuf::from("/test/input"),
            output_path: PathBuf::from("/test/output"),
            source_format: source,
            target_format: target,
        }
    }

    #[tokio::test]
    async fn test_default_convert_is_not_cancelled() {
        let outcome = EchoConverter
            .convert(job(Format::Docx, Format::Pdf))
            .await
            .unwrap();
        assert_eq!(outcome.job_id, "test-job");
    }

    #[tokio::test]
    async fn test_cancelled_token_is_passed_through() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = EchoConverter
            .convert_cancellable(job(Format::Docx, Format::Pdf), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::Cancelled));
    }

    #[test]
    fn test_supports_uses_routing_table() {
        assert!(EchoConverter.supports(Format::Png, Format::Txt));
        assert!(!EchoConverter.supports(Format::Txt, Format::Png));
        assert_eq!(
            EchoConverter.supported_conversions().len(),
            routes::supported_conversions().len()
        );
    }
}
