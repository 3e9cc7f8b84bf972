//! Sequential batch execution
//!
//! One caller-supplied async operation runs per file, in order. Pause and
//! stop are observed between files: in-flight work always finishes, which
//! is the same contract a user sees in the single-file tools. Per-item
//! errors are recorded and the run continues.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::job::{BatchItem, ItemStatus};

/// One file queued for processing.
#[derive(Debug, Clone)]
pub struct BatchInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl BatchInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// One successfully produced output.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Emitted whenever an item's visible state changes.
#[derive(Debug, Clone)]
pub struct BatchEvent {
    pub index: usize,
    pub name: String,
    pub status: ItemStatus,
    pub progress: u8,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Running,
    Paused,
    Stopped,
}

/// Pause/resume/stop switch for a running batch.
///
/// Takes effect between files; the file currently being processed is
/// never interrupted.
#[derive(Clone)]
pub struct BatchHandle {
    tx: Arc<watch::Sender<Control>>,
}

impl BatchHandle {
    pub fn pause(&self) {
        let _ = self.tx.send(Control::Paused);
    }

    pub fn resume(&self) {
        let _ = self.tx.send(Control::Running);
    }

    pub fn stop(&self) {
        let _ = self.tx.send(Control::Stopped);
    }
}

type EventSink = Arc<dyn Fn(BatchEvent) + Send + Sync>;

/// Item-scoped progress reporter handed to the per-file operation.
#[derive(Clone)]
pub struct ItemProgress {
    index: usize,
    name: String,
    sink: Option<EventSink>,
}

impl ItemProgress {
    /// Report intra-file progress (0-100).
    pub fn report(&self, percent: u8) {
        if let Some(sink) = &self.sink {
            sink(BatchEvent {
                index: self.index,
                name: self.name.clone(),
                status: ItemStatus::Processing,
                progress: percent.min(100),
                error: None,
            });
        }
    }
}

/// Final state of a batch run.
#[derive(Debug)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
    pub outputs: Vec<BatchOutput>,
    /// True when the run ended early via `BatchHandle::stop`.
    pub stopped: bool,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn completed(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.status == ItemStatus::Completed)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.status == ItemStatus::Failed)
            .count()
    }

    /// Holds for every run that was not stopped early.
    pub fn is_complete(&self) -> bool {
        self.completed() + self.failed() == self.total()
    }
}

/// Sequential batch runner.
pub struct BatchRunner {
    control: watch::Receiver<Control>,
    events: Option<EventSink>,
}

impl BatchRunner {
    /// Create a runner and its control handle.
    pub fn new() -> (Self, BatchHandle) {
        let (tx, rx) = watch::channel(Control::Running);
        (
            Self {
                control: rx,
                events: None,
            },
            BatchHandle { tx: Arc::new(tx) },
        )
    }

    /// Attach an observer for item state changes.
    pub fn with_events(mut self, sink: impl Fn(BatchEvent) + Send + Sync + 'static) -> Self {
        self.events = Some(Arc::new(sink));
        self
    }

    /// Run `op` over every input in order.
    ///
    /// Each input is visited exactly once. Unless the batch is stopped,
    /// the report satisfies `completed + failed == total`.
    pub async fn run<F, Fut, E>(mut self, inputs: Vec<BatchInput>, op: F) -> BatchReport
    where
        F: Fn(BatchInput, ItemProgress) -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
        E: std::fmt::Display,
    {
        let mut items: Vec<BatchItem> = inputs.iter().map(|i| BatchItem::new(&i.name)).collect();
        let mut outputs = Vec::new();
        let mut stopped = false;

        info!(total = inputs.len(), "batch started");

        for (index, input) in inputs.into_iter().enumerate() {
            if self.wait_until_runnable().await == Control::Stopped {
                warn!(index, "batch stopped before item");
                stopped = true;
                break;
            }

            let name = input.name.clone();
            debug!(index, name = %name, "processing");

            // advance() cannot fail here: the runner drives every item
            // Pending -> Processing exactly once
            let _ = items[index].advance(ItemStatus::Processing);
            self.emit(&items, index);

            let progress = ItemProgress {
                index,
                name: name.clone(),
                sink: self.events.clone(),
            };

            match op(input, progress).await {
                Ok(bytes) => {
                    let _ = items[index].advance(ItemStatus::Completed);
                    outputs.push(BatchOutput { name, bytes });
                }
                Err(e) => {
                    warn!(index, error = %e, "item failed");
                    let _ = items[index].fail(e.to_string());
                }
            }
            self.emit(&items, index);
        }

        let report = BatchReport {
            items,
            outputs,
            stopped,
        };
        info!(
            completed = report.completed(),
            failed = report.failed(),
            stopped = report.stopped,
            "batch finished"
        );
        report
    }

    /// Await Running or Stopped; parks while Paused.
    async fn wait_until_runnable(&mut self) -> Control {
        loop {
            let state = *self.control.borrow();
            match state {
                Control::Running | Control::Stopped => return state,
                Control::Paused => {
                    // Handle dropped while paused: treat as stopped
                    if self.control.changed().await.is_err() {
                        return Control::Stopped;
                    }
                }
            }
        }
    }

    fn emit(&self, items: &[BatchItem], index: usize) {
        if let Some(sink) = &self.events {
            let item = &items[index];
            sink(BatchEvent {
                index,
                name: item.name.clone(),
                status: item.status,
                progress: item.progress,
                error: item.error.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn inputs(n: usize) -> Vec<BatchInput> {
        (0..n)
            .map(|i| BatchInput::new(format!("file{}.pdf", i), vec![i as u8]))
            .collect()
    }

    #[tokio::test]
    async fn test_run_visits_every_input_once() {
        let (runner, _handle) = BatchRunner::new();
        let visits = Arc::new(AtomicUsize::new(0));
        let visits_op = visits.clone();

        let report = runner
            .run(inputs(5), move |input, _progress| {
                let visits = visits_op.clone();
                async move {
                    visits.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(input.bytes)
                }
            })
            .await;

        assert_eq!(visits.load(Ordering::SeqCst), 5);
        assert_eq!(report.total(), 5);
        assert_eq!(report.completed(), 5);
        assert_eq!(report.failed(), 0);
        assert!(report.is_complete());
        assert_eq!(report.outputs.len(), 5);
    }

    #[tokio::test]
    async fn test_errors_recorded_and_run_continues() {
        let (runner, _handle) = BatchRunner::new();

        let report = runner
            .run(inputs(4), |input, _progress| async move {
                if input.name == "file1.pdf" || input.name == "file2.pdf" {
                    Err(format!("cannot process {}", input.name))
                } else {
                    Ok(input.bytes)
                }
            })
            .await;

        assert_eq!(report.completed(), 2);
        assert_eq!(report.failed(), 2);
        assert!(report.is_complete());
        assert_eq!(report.outputs.len(), 2);

        let failed: Vec<_> = report
            .items
            .iter()
            .filter(|i| i.status == ItemStatus::Failed)
            .collect();
        assert!(failed.iter().all(|i| i.error.is_some()));
    }

    #[tokio::test]
    async fn test_pause_blocks_until_resume() {
        let (runner, handle) = BatchRunner::new();
        handle.pause();

        let visits = Arc::new(AtomicUsize::new(0));
        let visits_op = visits.clone();

        let run = tokio::spawn(runner.run(inputs(3), move |input, _progress| {
            let visits = visits_op.clone();
            async move {
                visits.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(input.bytes)
            }
        }));

        // Paused before the first item: nothing may run
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(visits.load(Ordering::SeqCst), 0);

        handle.resume();
        let report = run.await.unwrap();
        assert_eq!(visits.load(Ordering::SeqCst), 3);
        assert!(report.is_complete());
        assert!(!report.stopped);
    }

    #[tokio::test]
    async fn test_stop_leaves_remainder_pending() {
        let (runner, handle) = BatchRunner::new();
        handle.stop();

        let report = runner
            .run(inputs(3), |input, _progress| async move {
                Ok::<_, String>(input.bytes)
            })
            .await;

        assert!(report.stopped);
        assert_eq!(report.completed(), 0);
        assert!(report
            .items
            .iter()
            .all(|i| i.status == ItemStatus::Pending));
    }

    #[tokio::test]
    async fn test_stop_while_paused_mid_run() {
        let (runner, handle) = BatchRunner::new();

        let handle_op = handle.clone();
        let run = tokio::spawn(runner.run(inputs(3), move |input, _progress| {
            // Pause the batch from inside the first item; the pause takes
            // effect before the second item starts
            if input.name == "file0.pdf" {
                handle_op.pause();
            }
            async move { Ok::<_, String>(input.bytes) }
        }));

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop();

        let report = run.await.unwrap();
        assert!(report.stopped);
        assert_eq!(report.completed(), 1);
        assert_eq!(report.items[1].status, ItemStatus::Pending);
        assert_eq!(report.items[2].status, ItemStatus::Pending);
    }

    #[tokio::test]
    async fn test_events_cover_lifecycle() {
        let events: Arc<Mutex<Vec<BatchEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();

        let (runner, _handle) = BatchRunner::new();
        let runner = runner.with_events(move |event| sink.lock().unwrap().push(event));

        runner
            .run(inputs(2), |input, progress| async move {
                progress.report(50);
                Ok::<_, String>(input.bytes)
            })
            .await;

        let events = events.lock().unwrap();
        // Per item: Processing, mid-item 50%, Completed
        assert_eq!(events.len(), 6);
        assert!(events
            .iter()
            .any(|e| e.status == ItemStatus::Processing && e.progress == 50));
        assert_eq!(
            events
                .iter()
                .filter(|e| e.status == ItemStatus::Completed)
                .count(),
            2
        );
    }
}
