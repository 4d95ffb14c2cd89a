//! Types for the processor module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::converter::{ConversionKind, ErrorKind, Format};

/// Opaque task identifier (a UUID v4 string).
pub type TaskId = String;

/// Lifecycle state of a task.
///
/// `pending -> processing -> {completed | failed | cancelled}`, and
/// `pending -> cancelled`. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a task converts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub source_path: PathBuf,
    /// Where the tool writes its product.
    pub output_path: PathBuf,
    pub source_format: Format,
    pub target_format: Format,
    /// SHA-256 of the source, when it was hashed before submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// A conversion request tracked by the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionTask {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub kind: ConversionKind,
    pub payload: TaskPayload,
    pub status: TaskStatus,
    /// Output path on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PathBuf>,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Whether the result was served from the cache.
    #[serde(default)]
    pub cache_hit: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ConversionTask {
    /// Creates a pending task.
    pub fn new(id: TaskId, kind: ConversionKind, payload: TaskPayload) -> Self {
        Self {
            id,
            kind,
            payload,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            error_kind: None,
            cache_hit: false,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Time between start and finish, if both are known.
    pub fn processing_ms(&self) -> Option<u64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0) as u64),
            _ => None,
        }
    }
}

/// Why an executor gave up on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl TaskFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "Task cancelled")
    }
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Lifecycle notification delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "task", rename_all = "snake_case")]
pub enum TaskEvent {
    Added(ConversionTask),
    Started(ConversionTask),
    Completed(ConversionTask),
    Failed(ConversionTask),
    Cancelled(ConversionTask),
}

impl TaskEvent {
    /// Snapshot of the task at the time of the event.
    pub fn task(&self) -> &ConversionTask {
        match self {
            Self::Added(t)
            | Self::Started(t)
            | Self::Completed(t)
            | Self::Failed(t)
            | Self::Cancelled(t) => t,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Started(_) => "started",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Cancelled(_) => "cancelled",
        }
    }

    /// Event announcing that `task` reached its terminal state.
    pub(crate) fn terminal(task: ConversionTask) -> Self {
        match task.status {
            TaskStatus::Failed => Self::Failed(task),
            TaskStatus::Cancelled => Self::Cancelled(task),
            _ => Self::Completed(task),
        }
    }
}

/// Queue counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    /// Retained terminal tasks by status.
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub max_concurrent: usize,
    /// Tasks that reached `completed` or `failed` since startup.
    pub total_processed: u64,
    pub total_failed: u64,
    /// Mean time in `processing` for tasks that ran.
    pub average_processing_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> TaskPayload {
        TaskPayload {
            source_path: PathBuf::from("/in/a.txt"),
            output_path: PathBuf::from("/work/t-1.pdf"),
            source_format: Format::Txt,
            target_format: Format::Pdf,
            content_hash: None,
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_new_task_is_pending() {
        let task = ConversionTask::new("t-1".to_string(), ConversionKind::Document, payload());
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.started_at.is_none());
        assert_eq!(task.processing_ms(), None);
    }

    #[test]
    fn test_task_serialization() {
        let task = ConversionTask::new("t-1".to_string(), ConversionKind::Document, payload());
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["type"], "document");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["payload"]["target_format"], "pdf");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_event_serialization() {
        let task = ConversionTask::new("t-1".to_string(), ConversionKind::Ocr, payload());
        let json = serde_json::to_value(TaskEvent::Added(task)).unwrap();
        assert_eq!(json["event"], "added");
        assert_eq!(json["task"]["id"], "t-1");
    }

    #[test]
    fn test_terminal_event_follows_status() {
        let mut task = ConversionTask::new("t-1".to_string(), ConversionKind::Pdf, payload());
        task.status = TaskStatus::Cancelled;
        assert_eq!(TaskEvent::terminal(task.clone()).name(), "cancelled");
        task.status = TaskStatus::Failed;
        assert_eq!(TaskEvent::terminal(task).name(), "failed");
    }
}
