//! Testing utilities and mock implementations.
//!
//! This module provides a mock converter and small fixtures so the queue,
//! the orchestrator and the HTTP layer can be tested without LibreOffice,
//! ImageMagick, Ghostscript or Tesseract installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use filemill_core::testing::{fixtures, MockConverter};
//!
//! let dir = tempfile::TempDir::new()?;
//! let config = fixtures::test_config(dir.path());
//! let converter = Arc::new(MockConverter::new());
//!
//! let orchestrator = ConversionOrchestrator::new(&config, converter.clone()).await?;
//! ```

mod mock_converter;

pub use mock_converter::{MockConverter, RecordedConversion};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::cache::CacheConfig;
    use crate::config::Config;
    use crate::converter::ConverterConfig;
    use crate::processor::ProcessorConfig;

    /// Config whose cache and work directories live under `root`.
    pub fn test_config(root: &Path) -> Config {
        Config {
            cache: CacheConfig::default().with_directory(root.join("cache")),
            converter: ConverterConfig::default().with_work_dir(root.join("work")),
            processor: ProcessorConfig::default(),
            ..Default::default()
        }
    }

    /// Writes `contents` to `root/name` and returns the path.
    pub fn source_file(root: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        // Fixture helper: a failed write surfaces as SourceUnreadable in the test
        let _ = std::fs::write(&path, contents);
        path
    }
}
