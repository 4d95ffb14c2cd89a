//! Task queue lifecycle integration tests.
//!
//! These tests drive the queue through its public API with a scripted
//! executor: pending -> processing -> completed | failed | cancelled

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use filemill_core::{
    converter::{ConversionKind, ErrorKind, Format},
    processor::{
        ConversionTask, ProcessorConfig, ProcessorError, Subscription, TaskEvent, TaskExecutor,
        TaskFailure, TaskPayload, TaskQueue, TaskStatus,
    },
};

/// Sleeps for `delay`, then fails if the source name contains "bad".
struct ScriptedExecutor {
    delay: Duration,
}

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        task: &ConversionTask,
        cancel: CancellationToken,
    ) -> Result<PathBuf, TaskFailure> {
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => {}
            _ = cancel.cancelled() => return Err(TaskFailure::cancelled()),
        }
        if task.payload.source_path.to_string_lossy().contains("bad") {
            return Err(TaskFailure::new(
                ErrorKind::ToolExecutionFailed,
                "soffice exited with code 1",
            ));
        }
        Ok(task.payload.output_path.clone())
    }
}

fn create_queue(max_concurrent: usize, delay_ms: u64) -> TaskQueue {
    let config = ProcessorConfig::default().with_max_concurrent(max_concurrent);
    TaskQueue::new(
        config,
        Arc::new(ScriptedExecutor {
            delay: Duration::from_millis(delay_ms),
        }),
    )
}

fn payload(name: &str) -> TaskPayload {
    TaskPayload {
        source_path: PathBuf::from(format!("/in/{}", name)),
        output_path: PathBuf::from(format!("/work/{}.pdf", name)),
        source_format: Format::Txt,
        target_format: Format::Pdf,
        content_hash: None,
    }
}

type EventLog = Arc<Mutex<Vec<(String, &'static str)>>>;

/// Records every event as (task id, event name).
fn record_events(queue: &TaskQueue) -> (EventLog, Subscription) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let subscription = queue.subscribe(move |event: &TaskEvent| {
        sink.lock()
            .unwrap()
            .push((event.task().id.clone(), event.name()));
    });
    (events, subscription)
}

#[tokio::test]
async fn test_concurrency_cap_splits_processing_and_pending() {
    let queue = create_queue(2, 200);

    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(
            queue
                .submit(ConversionKind::Document, payload(&format!("f{}.txt", i)))
                .await,
        );
    }

    let stats = queue.stats().await;
    assert_eq!(stats.processing, 2);
    assert_eq!(stats.pending, 3);
    assert_eq!(stats.max_concurrent, 2);

    for id in &ids {
        let task = queue.wait(id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }

    let stats = queue.stats().await;
    assert_eq!(stats.processing, 0);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.completed, 5);
    assert_eq!(stats.total_processed, 5);
}

#[tokio::test]
async fn test_processing_never_exceeds_cap() {
    let queue = create_queue(3, 20);
    let in_flight = Arc::new(Mutex::new((0usize, 0usize)));
    let tracker = in_flight.clone();
    let _subscription = queue.subscribe(move |event: &TaskEvent| {
        let mut guard = tracker.lock().unwrap();
        match event {
            TaskEvent::Started(_) => {
                guard.0 += 1;
                guard.1 = guard.1.max(guard.0);
            }
            TaskEvent::Completed(_) | TaskEvent::Failed(_) | TaskEvent::Cancelled(_) => {
                guard.0 = guard.0.saturating_sub(1);
            }
            TaskEvent::Added(_) => {}
        }
    });

    let mut ids = Vec::new();
    for i in 0..12 {
        ids.push(
            queue
                .submit(ConversionKind::Document, payload(&format!("n{}.txt", i)))
                .await,
        );
    }
    for id in &ids {
        queue.wait(id).await.unwrap();
    }

    let (current, peak) = *in_flight.lock().unwrap();
    assert_eq!(current, 0);
    assert_eq!(peak, 3);
}

#[tokio::test]
async fn test_fifo_admission_with_single_slot() {
    let queue = create_queue(1, 50);

    // Tracks whether a.txt was already terminal when b.txt started
    let terminal: Arc<Mutex<HashMap<String, bool>>> = Arc::new(Mutex::new(HashMap::new()));
    let a_done_when_b_started = Arc::new(Mutex::new(None));
    let (terminal_sink, started_sink) = (terminal.clone(), a_done_when_b_started.clone());
    let _subscription = queue.subscribe(move |event: &TaskEvent| {
        let task = event.task();
        match event {
            TaskEvent::Started(_) if task.payload.source_path.ends_with("b.txt") => {
                let a_done = terminal_sink.lock().unwrap().get("a.txt").copied();
                *started_sink.lock().unwrap() = Some(a_done.unwrap_or(false));
            }
            TaskEvent::Completed(_) | TaskEvent::Failed(_) => {
                let name = task
                    .payload
                    .source_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                terminal_sink.lock().unwrap().insert(name, true);
            }
            _ => {}
        }
    });

    let a = queue.submit(ConversionKind::Document, payload("a.txt")).await;
    let b = queue.submit(ConversionKind::Document, payload("b.txt")).await;

    assert_eq!(queue.status(&a).await.unwrap().status, TaskStatus::Processing);
    assert_eq!(queue.status(&b).await.unwrap().status, TaskStatus::Pending);

    let a_task = queue.wait(&a).await.unwrap();
    let b_task = queue.wait(&b).await.unwrap();

    assert!(a_task.started_at.unwrap() < b_task.started_at.unwrap());
    assert!(b_task.started_at.unwrap() >= a_task.finished_at.unwrap());
    assert_eq!(*a_done_when_b_started.lock().unwrap(), Some(true));
}

#[tokio::test]
async fn test_terminal_states_are_final() {
    let queue = create_queue(2, 10);
    let (events, _subscription) = record_events(&queue);

    let ok = queue.submit(ConversionKind::Document, payload("ok.txt")).await;
    let bad = queue.submit(ConversionKind::Document, payload("bad.txt")).await;
    queue.wait(&ok).await.unwrap();
    let failed = queue.wait(&bad).await.unwrap();

    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.error_kind, Some(ErrorKind::ToolExecutionFailed));
    assert!(failed.error.unwrap().contains("exited with code 1"));

    // Neither can be cancelled afterwards
    assert!(matches!(
        queue.cancel(&ok).await,
        Err(ProcessorError::AlreadyTerminal { status: TaskStatus::Completed, .. })
    ));
    assert!(matches!(
        queue.cancel(&bad).await,
        Err(ProcessorError::AlreadyTerminal { status: TaskStatus::Failed, .. })
    ));

    let events = events.lock().unwrap().clone();
    for id in [&ok, &bad] {
        let names: Vec<_> = events
            .iter()
            .filter(|(task_id, _)| task_id == id)
            .map(|(_, name)| *name)
            .collect();
        assert_eq!(names.len(), 3, "events for {}: {:?}", id, names);
        assert_eq!(names[0], "added");
        assert_eq!(names[1], "started");
    }

    let stats = queue.stats().await;
    assert_eq!(stats.total_processed, 2);
    assert_eq!(stats.total_failed, 1);
}

#[tokio::test]
async fn test_cancel_pending_and_processing() {
    let queue = create_queue(1, 5_000);

    let running = queue.submit(ConversionKind::Document, payload("slow.txt")).await;
    let waiting = queue.submit(ConversionKind::Document, payload("next.txt")).await;

    let cancelled = queue.cancel(&waiting).await.unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert_eq!(queue.stats().await.pending, 0);

    let snapshot = queue.cancel(&running).await.unwrap();
    assert_eq!(snapshot.status, TaskStatus::Processing);

    let finished = tokio::time::timeout(Duration::from_secs(2), queue.wait(&running))
        .await
        .expect("cancelled task should finish promptly")
        .unwrap();
    assert_eq!(finished.status, TaskStatus::Cancelled);
    assert_eq!(finished.error_kind, Some(ErrorKind::Cancelled));

    let stats = queue.stats().await;
    assert_eq!(stats.cancelled, 2);
    assert_eq!(stats.processing, 0);
}

#[tokio::test]
async fn test_unknown_task() {
    let queue = create_queue(1, 10);

    assert!(queue.status("missing").await.is_none());
    assert!(matches!(
        queue.wait("missing").await,
        Err(ProcessorError::TaskNotFound(_))
    ));
    assert!(matches!(
        queue.cancel("missing").await,
        Err(ProcessorError::TaskNotFound(_))
    ));
}

#[tokio::test]
async fn test_history_is_bounded() {
    let config = ProcessorConfig::default()
        .with_max_concurrent(4)
        .with_history_limit(2);
    let queue = TaskQueue::new(
        config,
        Arc::new(ScriptedExecutor {
            delay: Duration::from_millis(1),
        }),
    );

    let first = queue.submit(ConversionKind::Document, payload("1.txt")).await;
    queue.wait(&first).await.unwrap();
    let second = queue.submit(ConversionKind::Document, payload("2.txt")).await;
    queue.wait(&second).await.unwrap();
    let third = queue.submit(ConversionKind::Document, payload("3.txt")).await;
    queue.wait(&third).await.unwrap();

    assert!(queue.status(&first).await.is_none());
    assert!(queue.status(&second).await.is_some());
    assert!(queue.status(&third).await.is_some());
    assert_eq!(queue.stats().await.total_processed, 3);
}

#[tokio::test]
async fn test_dropped_subscription_stops_events() {
    let queue = create_queue(1, 1);
    let (events, subscription) = record_events(&queue);

    let id = queue.submit(ConversionKind::Document, payload("x.txt")).await;
    queue.wait(&id).await.unwrap();
    let seen = events.lock().unwrap().len();
    assert_eq!(seen, 3);

    drop(subscription);
    let id = queue.submit(ConversionKind::Document, payload("y.txt")).await;
    queue.wait(&id).await.unwrap();
    assert_eq!(events.lock().unwrap().len(), seen);
}
