//! Configuration for the processor module.

use serde::{Deserialize, Serialize};

/// Configuration for the task queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Maximum tasks in `processing` at once.
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,

    /// Terminal tasks kept for status queries; the oldest are dropped first.
    #[serde(default = "default_task_history_limit")]
    pub task_history_limit: usize,
}

fn default_max_concurrent_tasks() -> usize {
    3
}

fn default_task_history_limit() -> usize {
    1000
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: default_max_concurrent_tasks(),
            task_history_limit: default_task_history_limit(),
        }
    }
}

impl ProcessorConfig {
    /// Sets the concurrency cap.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    /// Sets the number of terminal tasks retained.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.task_history_limit = limit;
        self
    }
}
