//! Error types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use super::types::ToolKind;

/// Machine-readable classification of a conversion failure.
///
/// This is what callers see in results; the full error stays in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No tool handles the requested format pair.
    UnsupportedConversion,
    /// The external process ran past the configured limit.
    ConversionTimeout,
    /// The external process exited non-zero or could not be run.
    ToolExecutionFailed,
    /// The tool reported success but wrote nothing.
    OutputNotProduced,
    /// The source file is missing or unreadable.
    SourceUnreadable,
    /// The cache could not be read or written.
    CacheIoError,
    /// The task was cancelled before it finished.
    Cancelled,
    /// Anything else, including panics inside an executor.
    Internal,
}

impl ErrorKind {
    /// Returns the snake_case name used in logs and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedConversion => "unsupported_conversion",
            Self::ConversionTimeout => "conversion_timeout",
            Self::ToolExecutionFailed => "tool_execution_failed",
            Self::OutputNotProduced => "output_not_produced",
            Self::SourceUnreadable => "source_unreadable",
            Self::CacheIoError => "cache_io_error",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// No tool mapping exists for the format pair.
    #[error("Unsupported conversion: {source_format} -> {target_format}")]
    UnsupportedConversion {
        source_format: String,
        target_format: String,
    },

    /// Format string not recognised.
    #[error("Unknown format: {format}")]
    UnknownFormat { format: String },

    /// Source file missing or unreadable.
    #[error("Source file unreadable: {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    /// Tool binary not found.
    #[error("{tool} not found at path: {path}")]
    ToolNotFound { tool: ToolKind, path: PathBuf },

    /// Output directory does not exist and could not be created.
    #[error("Failed to create output directory: {path}")]
    OutputDirectoryFailed { path: PathBuf },

    /// Tool exited with a non-zero status.
    #[error("{tool} exited with code {code:?}")]
    ToolExecutionFailed {
        tool: ToolKind,
        code: Option<i32>,
        diagnostics: Option<String>,
    },

    /// Tool exited cleanly without writing the output file.
    #[error("{tool} did not produce output file: {path}")]
    OutputNotProduced {
        tool: ToolKind,
        path: PathBuf,
        diagnostics: Option<String>,
    },

    /// Conversion timed out.
    #[error("Conversion timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Job was cancelled.
    #[error("Conversion cancelled")]
    Cancelled,
}

impl ConverterError {
    /// Creates an unsupported conversion error for a format pair.
    pub fn unsupported(source_format: impl ToString, target_format: impl ToString) -> Self {
        Self::UnsupportedConversion {
            source_format: source_format.to_string(),
            target_format: target_format.to_string(),
        }
    }

    /// Creates a source unreadable error.
    pub fn source_unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedConversion { .. } | Self::UnknownFormat { .. } => {
                ErrorKind::UnsupportedConversion
            }
            Self::SourceUnreadable { .. } => ErrorKind::SourceUnreadable,
            Self::ToolNotFound { .. }
            | Self::OutputDirectoryFailed { .. }
            | Self::ToolExecutionFailed { .. }
            | Self::Io(_) => ErrorKind::ToolExecutionFailed,
            Self::OutputNotProduced { .. } => ErrorKind::OutputNotProduced,
            Self::Timeout { .. } => ErrorKind::ConversionTimeout,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Captured tool output, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::ToolExecutionFailed { diagnostics, .. }
            | Self::OutputNotProduced { diagnostics, .. } => diagnostics.as_deref(),
            _ => None,
        }
    }

    /// Error message including the captured tool output.
    pub fn detailed_message(&self) -> String {
        match self.diagnostics() {
            Some(diag) if !diag.trim().is_empty() => format!("{}: {}", self, diag.trim()),
            _ => self.to_string(),
        }
    }

    /// Whether resubmitting the same input could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
