//! Single-worker FIFO update queue.
//!
//! Every mutation of an incremental repository after its initial load runs as
//! a job on this queue. One worker drains the queue in submission order, so
//! jobs never run concurrently with each other and always run in the order
//! they were scheduled.
//!
//! ```text
//!  schedule(job) ──► mpsc ──► worker task ──► spawn_blocking(job)
//!                                  │                │
//!                                  │         panic? ┴─► logged, queue continues
//!                                  ▼
//!                         shutdown token cancels the loop
//! ```
//!
//! Jobs run on the blocking pool because they read files and take the table
//! lock. A job that panics is reported and the worker moves on.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A unit of work for the update worker.
pub type UpdateJob = Box<dyn FnOnce() + Send + 'static>;

struct QueuedUpdate {
    sequence: u64,
    label: &'static str,
    job: UpdateJob,
    enqueued_at: Instant,
}

/// Counters shared between the queue handle and its worker.
#[derive(Debug, Default)]
struct QueueCounters {
    next_sequence: AtomicU64,
    pending: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of queue counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub pending: usize,
    pub completed: u64,
    pub failed: u64,
}

/// Handle for submitting jobs to the update worker.
#[derive(Clone)]
pub struct UpdateQueue {
    tx: mpsc::UnboundedSender<QueuedUpdate>,
    shutdown: CancellationToken,
    counters: Arc<QueueCounters>,
}

impl UpdateQueue {
    /// Spawn the worker on `handle` and return the submission handle.
    pub fn start(handle: &Handle) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let counters = Arc::new(QueueCounters::default());
        let worker = handle.spawn(Self::run(rx, shutdown.clone(), Arc::clone(&counters)));
        (
            Self {
                tx,
                shutdown,
                counters,
            },
            worker,
        )
    }

    /// Append a job. Returns `false` if the worker has stopped.
    pub fn schedule<F>(&self, label: &'static str, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shutdown.is_cancelled() {
            debug!(label, "Update queue stopped; dropping job");
            return false;
        }
        let sequence = self.counters.next_sequence.fetch_add(1, Ordering::Relaxed);
        self.counters.pending.fetch_add(1, Ordering::Relaxed);
        let update = QueuedUpdate {
            sequence,
            label,
            job: Box::new(job),
            enqueued_at: Instant::now(),
        };
        if self.tx.send(update).is_err() {
            self.counters.pending.fetch_sub(1, Ordering::Relaxed);
            debug!(label, "Update worker gone; dropping job");
            return false;
        }
        true
    }

    /// Enqueue a marker job; the receiver completes once every job scheduled
    /// before it has run. If the worker stops first the receiver errors.
    pub fn barrier(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.schedule("barrier", move || {
            let _ = tx.send(());
        });
        rx
    }

    /// Stop the worker after the job in progress, if any.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.counters.pending.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    async fn run(
        mut rx: mpsc::UnboundedReceiver<QueuedUpdate>,
        shutdown: CancellationToken,
        counters: Arc<QueueCounters>,
    ) {
        info!("Update worker starting");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Update worker shutting down");
                    break;
                }

                update = rx.recv() => {
                    match update {
                        Some(update) => Self::execute(update, &counters).await,
                        None => {
                            debug!("All queue handles dropped");
                            break;
                        }
                    }
                }
            }
        }

        info!(
            completed = counters.completed.load(Ordering::Relaxed),
            failed = counters.failed.load(Ordering::Relaxed),
            "Update worker stopped"
        );
    }

    async fn execute(update: QueuedUpdate, counters: &QueueCounters) {
        let QueuedUpdate {
            sequence,
            label,
            job,
            enqueued_at,
        } = update;
        let waited = enqueued_at.elapsed();

        match tokio::task::spawn_blocking(job).await {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    sequence,
                    label,
                    waited_ms = waited.as_millis() as u64,
                    "Update job finished"
                );
            }
            Err(e) if e.is_panic() => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(sequence, label, "Update job panicked");
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(sequence, label, error = %e, "Update job did not complete");
            }
        }
        counters.pending.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn test_jobs_run_in_order() {
        let (queue, _worker) = UpdateQueue::start(&Handle::current());
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let seen = Arc::clone(&seen);
            queue.schedule("push", move || seen.lock().push(i));
        }
        queue.barrier().await.unwrap();
        assert_eq!(*seen.lock(), (0..10).collect::<Vec<_>>());
        // The barrier itself may still be finishing.
        assert!(queue.stats().completed >= 10);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stop_worker() {
        let (queue, _worker) = UpdateQueue::start(&Handle::current());
        let ran = Arc::new(AtomicUsize::new(0));
        queue.schedule("boom", || panic!("job failure"));
        let counter = Arc::clone(&ran);
        queue.schedule("after", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        queue.barrier().await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(queue.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_jobs() {
        let (queue, worker) = UpdateQueue::start(&Handle::current());
        queue.shutdown();
        worker.await.unwrap();
        assert!(queue.is_shut_down());
        assert!(!queue.schedule("late", || {}));
        assert!(queue.barrier().await.is_err());
    }
}
