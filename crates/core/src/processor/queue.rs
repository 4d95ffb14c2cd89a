//! FIFO task queue with a concurrency cap.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::converter::{ConversionKind, ErrorKind};
use crate::metrics;

use super::config::ProcessorConfig;
use super::types::{
    ConversionTask, QueueStats, TaskEvent, TaskFailure, TaskId, TaskPayload, TaskStatus,
};

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// Unknown id, or dropped from the history.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// The task already reached a terminal state.
    #[error("Task {id} is already {status}")]
    AlreadyTerminal { id: TaskId, status: TaskStatus },
}

/// Runs one admitted task to completion.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Returns the output path on success.
    ///
    /// `cancel` fires when the task is cancelled while processing; the
    /// executor should stop its work and return promptly.
    async fn execute(
        &self,
        task: &ConversionTask,
        cancel: CancellationToken,
    ) -> Result<PathBuf, TaskFailure>;
}

/// Callback for task lifecycle events.
pub type EventCallback = Arc<dyn Fn(&TaskEvent) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    callbacks: Vec<(u64, EventCallback)>,
}

/// Handle returned by [`TaskQueue::subscribe`]; dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    subscribers: Weak<StdMutex<Subscribers>>,
}

impl Subscription {
    /// Stops delivery to this subscriber.
    pub fn cancel(self) {
        drop(self)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            let mut subs = subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            subs.callbacks.retain(|(id, _)| *id != self.id);
        }
    }
}

struct Running {
    task: ConversionTask,
    cancel: CancellationToken,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<ConversionTask>,
    processing: HashMap<TaskId, Running>,
    history: HashMap<TaskId, ConversionTask>,
    history_order: VecDeque<TaskId>,
    /// Callers blocked in `wait`, resolved with the terminal snapshot.
    waiters: HashMap<TaskId, Vec<oneshot::Sender<ConversionTask>>>,
    total_processed: u64,
    total_failed: u64,
    processing_ms_total: u64,
    processing_samples: u64,
}

impl QueueState {
    fn find(&self, id: &str) -> Option<&ConversionTask> {
        self.pending
            .iter()
            .find(|t| t.id == id)
            .or_else(|| self.processing.get(id).map(|r| &r.task))
            .or_else(|| self.history.get(id))
    }

    /// Moves a terminal task into the bounded history.
    fn retain(&mut self, task: ConversionTask, limit: usize) {
        for waiter in self.waiters.remove(&task.id).unwrap_or_default() {
            let _ = waiter.send(task.clone());
        }
        self.history_order.push_back(task.id.clone());
        self.history.insert(task.id.clone(), task);
        while self.history_order.len() > limit {
            if let Some(oldest) = self.history_order.pop_front() {
                self.history.remove(&oldest);
                debug!(task_id = %oldest, "Dropped task from history");
            }
        }
    }

    fn update_gauges(&self) {
        metrics::TASKS_PENDING.set(self.pending.len() as i64);
        metrics::TASKS_PROCESSING.set(self.processing.len() as i64);
    }
}

struct Shared {
    config: ProcessorConfig,
    executor: Arc<dyn TaskExecutor>,
    state: Mutex<QueueState>,
    subscribers: Arc<StdMutex<Subscribers>>,
}

impl Shared {
    /// Delivers an event to every subscriber, in subscription order.
    fn emit(&self, event: TaskEvent) {
        let callbacks: Vec<EventCallback> = {
            let subs = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subs.callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in callbacks {
            if std::panic::catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                warn!(event = event.name(), task_id = %event.task().id, "Task event subscriber panicked");
            }
        }
    }

    /// Starts pending tasks while slots are free, oldest first.
    fn admit(self: &Arc<Self>, state: &mut QueueState) {
        while state.processing.len() < self.config.max_concurrent_tasks {
            let Some(mut task) = state.pending.pop_front() else {
                break;
            };
            task.status = TaskStatus::Processing;
            task.started_at = Some(Utc::now());
            let cancel = CancellationToken::new();

            info!(
                task_id = %task.id,
                kind = task.kind.as_str(),
                processing = state.processing.len() + 1,
                "Task started"
            );

            state.processing.insert(
                task.id.clone(),
                Running {
                    task: task.clone(),
                    cancel: cancel.clone(),
                },
            );
            self.emit(TaskEvent::Started(task.clone()));
            self.spawn_runner(task, cancel);
        }
        state.update_gauges();
    }

    fn spawn_runner(self: &Arc<Self>, task: ConversionTask, cancel: CancellationToken) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let executor = Arc::clone(&shared.executor);
            let exec_task = task.clone();
            let exec_cancel = cancel.clone();
            // Own task so a panic surfaces as a JoinError instead of unwinding here
            let handle =
                tokio::spawn(async move { executor.execute(&exec_task, exec_cancel).await });
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(TaskFailure::internal(panic_message(e))),
            };
            shared.finish(&task.id, outcome, cancel.is_cancelled()).await;
        });
    }

    async fn finish(
        self: &Arc<Self>,
        id: &str,
        outcome: Result<PathBuf, TaskFailure>,
        cancel_requested: bool,
    ) {
        let mut state = self.state.lock().await;
        let Some(Running { mut task, .. }) = state.processing.remove(id) else {
            return;
        };
        task.finished_at = Some(Utc::now());

        match outcome {
            Ok(path) => {
                task.status = TaskStatus::Completed;
                task.result = Some(path);
            }
            Err(failure) if cancel_requested || failure.kind == ErrorKind::Cancelled => {
                task.status = TaskStatus::Cancelled;
                task.error = Some(failure.message);
                task.error_kind = Some(ErrorKind::Cancelled);
            }
            Err(failure) => {
                task.status = TaskStatus::Failed;
                task.error = Some(failure.message);
                task.error_kind = Some(failure.kind);
            }
        }

        let elapsed = task.processing_ms().unwrap_or(0);
        match task.status {
            TaskStatus::Completed => {
                state.total_processed += 1;
                info!(task_id = %task.id, duration_ms = elapsed, "Task completed");
            }
            TaskStatus::Failed => {
                state.total_processed += 1;
                state.total_failed += 1;
                warn!(
                    task_id = %task.id,
                    duration_ms = elapsed,
                    error_kind = ?task.error_kind,
                    error = task.error.as_deref().unwrap_or(""),
                    "Task failed"
                );
            }
            _ => info!(task_id = %task.id, "Task cancelled while processing"),
        }
        if task.status != TaskStatus::Cancelled {
            state.processing_ms_total += elapsed;
            state.processing_samples += 1;
        }

        state.retain(task.clone(), self.config.task_history_limit);
        self.emit(TaskEvent::terminal(task));
        self.admit(&mut state);
    }
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return format!("Task execution aborted: {}", err);
    }
    let payload = err.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("Task execution panicked: {}", detail)
}

/// Queue of conversion tasks.
///
/// At most `max_concurrent_tasks` run at once; the rest wait in submission
/// order. Cheap to clone.
#[derive(Clone)]
pub struct TaskQueue {
    shared: Arc<Shared>,
}

impl TaskQueue {
    /// Creates a queue that runs tasks with `executor`.
    pub fn new(config: ProcessorConfig, executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                executor,
                state: Mutex::new(QueueState::default()),
                subscribers: Arc::new(StdMutex::new(Subscribers::default())),
            }),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.shared.config
    }

    /// Generates a fresh task id.
    pub fn new_task_id() -> TaskId {
        Uuid::new_v4().to_string()
    }

    /// Enqueues a task under a new id.
    pub async fn submit(&self, kind: ConversionKind, payload: TaskPayload) -> TaskId {
        self.submit_with_id(Self::new_task_id(), kind, payload).await
    }

    /// Enqueues a task under a caller-chosen id.
    pub async fn submit_with_id(
        &self,
        id: TaskId,
        kind: ConversionKind,
        payload: TaskPayload,
    ) -> TaskId {
        let task = ConversionTask::new(id.clone(), kind, payload);
        let mut state = self.shared.state.lock().await;

        debug!(
            task_id = %id,
            kind = kind.as_str(),
            pending = state.pending.len() + 1,
            "Task added"
        );
        state.pending.push_back(task.clone());
        self.shared.emit(TaskEvent::Added(task));
        self.shared.admit(&mut state);

        id
    }

    /// Records a task that finished without running, such as a cache hit.
    pub async fn record_completed(
        &self,
        id: TaskId,
        kind: ConversionKind,
        payload: TaskPayload,
        result: PathBuf,
        cache_hit: bool,
    ) -> ConversionTask {
        let mut task = ConversionTask::new(id, kind, payload);
        task.status = TaskStatus::Completed;
        task.result = Some(result);
        task.cache_hit = cache_hit;
        task.started_at = Some(task.created_at);
        task.finished_at = Some(task.created_at);

        let mut state = self.shared.state.lock().await;
        state.total_processed += 1;
        state.retain(task.clone(), self.shared.config.task_history_limit);

        let mut added = task.clone();
        added.status = TaskStatus::Pending;
        added.result = None;
        added.started_at = None;
        added.finished_at = None;
        self.shared.emit(TaskEvent::Added(added));
        self.shared.emit(TaskEvent::Completed(task.clone()));
        drop(state);

        debug!(task_id = %task.id, cache_hit, "Task recorded as completed");
        task
    }

    /// Snapshot of a task: pending queue first, then in-flight, then history.
    pub async fn status(&self, id: &str) -> Option<ConversionTask> {
        let state = self.shared.state.lock().await;
        state.find(id).cloned()
    }

    /// Waits until the task is terminal and returns it.
    ///
    /// The terminal snapshot is handed over directly, so the result does not
    /// depend on the task still being in the history.
    pub async fn wait(&self, id: &str) -> Result<ConversionTask, ProcessorError> {
        let receiver = {
            let mut state = self.shared.state.lock().await;
            match state.find(id) {
                Some(task) if task.status.is_terminal() => return Ok(task.clone()),
                Some(_) => {}
                None => return Err(ProcessorError::TaskNotFound(id.to_string())),
            }
            let (sender, receiver) = oneshot::channel();
            state.waiters.entry(id.to_string()).or_default().push(sender);
            receiver
        };

        receiver
            .await
            .map_err(|_| ProcessorError::TaskNotFound(id.to_string()))
    }

    /// Cancels a task.
    ///
    /// A pending task is cancelled at once. A processing task is signalled
    /// and becomes `cancelled` when its executor returns; the returned
    /// snapshot is still `processing` in that case.
    pub async fn cancel(&self, id: &str) -> Result<ConversionTask, ProcessorError> {
        let mut state = self.shared.state.lock().await;

        let position = state.pending.iter().position(|t| t.id == id);
        if let Some(pos) = position {
            let removed = state.pending.remove(pos);
            if let Some(mut task) = removed {
                task.status = TaskStatus::Cancelled;
                task.finished_at = Some(Utc::now());
                task.error = Some("Task cancelled".to_string());
                task.error_kind = Some(ErrorKind::Cancelled);

                info!(task_id = %id, "Pending task cancelled");
                state.retain(task.clone(), self.shared.config.task_history_limit);
                self.shared.emit(TaskEvent::Cancelled(task.clone()));
                state.update_gauges();
                return Ok(task);
            }
        }

        if let Some(running) = state.processing.get(id) {
            info!(task_id = %id, "Cancelling processing task");
            running.cancel.cancel();
            return Ok(running.task.clone());
        }

        match state.history.get(id) {
            Some(task) => Err(ProcessorError::AlreadyTerminal {
                id: id.to_string(),
                status: task.status,
            }),
            None => Err(ProcessorError::TaskNotFound(id.to_string())),
        }
    }

    /// Registers a lifecycle observer.
    ///
    /// Callbacks run synchronously while the queue is locked, so they must
    /// not block or call back into the queue.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&TaskEvent) + Send + Sync + 'static,
    {
        let mut subs = self
            .shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subs.next_id += 1;
        let id = subs.next_id;
        subs.callbacks.push((id, Arc::new(callback)));
        Subscription {
            id,
            subscribers: Arc::downgrade(&self.shared.subscribers),
        }
    }

    /// Current counters.
    pub async fn stats(&self) -> QueueStats {
        let state = self.shared.state.lock().await;
        let count = |status: TaskStatus| {
            state
                .history
                .values()
                .filter(|t| t.status == status)
                .count()
        };
        let average_processing_ms = if state.processing_samples == 0 {
            0.0
        } else {
            state.processing_ms_total as f64 / state.processing_samples as f64
        };

        QueueStats {
            pending: state.pending.len(),
            processing: state.processing.len(),
            completed: count(TaskStatus::Completed),
            failed: count(TaskStatus::Failed),
            cancelled: count(TaskStatus::Cancelled),
            max_concurrent: self.shared.config.max_concurrent_tasks,
            total_processed: state.total_processed,
            total_failed: state.total_failed,
            average_processing_ms,
        }
    }
}
