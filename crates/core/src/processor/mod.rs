//! Processor module: the conversion task queue.
//!
//! This module provides the `TaskQueue` which:
//! - Accepts tasks and keeps them pending in submission order
//! - Runs at most `max_concurrent_tasks` of them at once through a `TaskExecutor`
//! - Notifies subscribers of every lifecycle transition
//! - Keeps a bounded history of finished tasks for status queries
//!
//! # Example
//!
//! ```ignore
//! use filemill_core::processor::{ProcessorConfig, TaskQueue, TaskEvent};
//!
//! let queue = TaskQueue::new(ProcessorConfig::default(), executor);
//!
//! let _subscription = queue.subscribe(|event: &TaskEvent| {
//!     println!("{} {}", event.name(), event.task().id);
//! });
//!
//! let id = queue.submit(ConversionKind::Document, payload).await;
//! let task = queue.wait(&id).await?;
//! println!("Finished as {}", task.status);
//! ```

mod config;
mod queue;
mod types;

pub use config::ProcessorConfig;
pub use queue::{EventCallback, ProcessorError, Subscription, TaskExecutor, TaskQueue};
pub use types::{
    ConversionTask, QueueStats, TaskEvent, TaskFailure, TaskId, TaskPayload, TaskStatus,
};
