//! Types for the conversion orchestrator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::CacheError;
use crate::converter::{ConverterError, ErrorKind};
use crate::processor::{ConversionTask, ProcessorError, TaskId, TaskStatus};

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Task not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// Task already finished.
    #[error("task {id} is already {status}")]
    AlreadyTerminal { id: TaskId, status: TaskStatus },

    /// Rejected before reaching the queue.
    #[error(transparent)]
    Converter(#[from] ConverterError),

    /// Cache administration failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Work directory could not be prepared.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProcessorError> for OrchestratorError {
    fn from(err: ProcessorError) -> Self {
        match err {
            ProcessorError::TaskNotFound(id) => Self::TaskNotFound(id),
            ProcessorError::AlreadyTerminal { id, status } => Self::AlreadyTerminal { id, status },
        }
    }
}

impl OrchestratorError {
    /// Classification for conversion failures; `None` for lookup errors.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Converter(e) => Some(e.kind()),
            Self::Cache(_) => Some(ErrorKind::CacheIoError),
            Self::Io(_) => Some(ErrorKind::Internal),
            Self::TaskNotFound(_) | Self::AlreadyTerminal { .. } => None,
        }
    }
}

/// Why a conversion did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of one conversion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Absent when the request failed before a task was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub duration_ms: u64,
    pub cache_hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ConversionFailure>,
}

impl ConversionResult {
    /// Builds the result of a terminal task.
    pub fn from_task(task: &ConversionTask) -> Self {
        let success = task.status == TaskStatus::Completed;
        let error = (!success).then(|| ConversionFailure {
            kind: task.error_kind.unwrap_or(ErrorKind::Internal),
            message: task
                .error
                .clone()
                .unwrap_or_else(|| format!("task ended as {}", task.status)),
        });

        Self {
            task_id: Some(task.id.clone()),
            success,
            output_path: if success { task.result.clone() } else { None },
            duration_ms: task.processing_ms().unwrap_or(0),
            cache_hit: task.cache_hit,
            error,
        }
    }

    /// Failure that happened before any task existed.
    pub fn rejected(kind: ErrorKind, message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            task_id: None,
            success: false,
            output_path: None,
            duration_ms,
            cache_hit: false,
            error: Some(ConversionFailure {
                kind,
                message: message.into(),
            }),
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}
