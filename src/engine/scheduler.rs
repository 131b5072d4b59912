// src/engine/scheduler.rs

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::job::{CancelToken, Job, JobHandle};
use super::worker::{QueuedJob, Shared, spawn_worker};
use super::{JobId, JobState, Priority};

/// Runs submitted jobs strictly one at a time, most urgent first.
///
/// Each scheduler owns exactly one worker, spawned by [`Scheduler::start`]
/// and stopped by [`Scheduler::shutdown`] (or when the scheduler is
/// dropped). Submission and cancellation may be called from any thread.
pub struct Scheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending_count())
            .field("registered", &self.shared.registry.len())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Create the scheduler and spawn its worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start() -> Self {
        let shared = Arc::new(Shared::new());
        let worker = spawn_worker(shared.clone());
        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Queue `job` and wake the worker.
    pub fn submit<J: Job>(&self, job: J, priority: Priority) -> JobHandle {
        let id = JobId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));
        let name = job.name().to_string();
        let cancel = CancelToken::new();
        let (state_tx, state_rx) = watch::channel(JobState::Queued);

        self.shared.registry.register(id, cancel.clone());
        self.shared.outstanding.send_modify(|n| *n += 1);

        let (sequence, pending) = {
            let mut queue = self.shared.lock_queue();
            let sequence = queue.push(
                priority,
                QueuedJob {
                    id,
                    priority,
                    job: Box::new(job),
                    cancel: cancel.clone(),
                    state: state_tx,
                },
            );
            (sequence, queue.len())
        };

        info!(%id, job = %name, priority, sequence, pending, "job submitted");
        self.shared.wakeup.notify_one();

        JobHandle {
            id,
            name,
            priority,
            cancel,
            state: state_rx,
        }
    }

    /// Cancel one job. Returns false if it had already finished.
    pub fn cancel(&self, handle: &JobHandle) -> bool {
        handle.cancel();
        let registered = self.shared.registry.cancel(handle.id);
        debug!(id = %handle.id, job = %handle.name, registered, "cancel requested");
        registered
    }

    /// Cancel every unfinished job and return how many were cancelled.
    ///
    /// A job that is already running keeps running unless it checks its
    /// token.
    pub fn cancel_all(&self) -> usize {
        let n = self.shared.registry.cancel_all();
        if n > 0 {
            warn!(cancelled = n, "cancelled all jobs");
        }
        n
    }

    /// Jobs waiting in the queue (the running one excluded).
    pub fn pending_count(&self) -> usize {
        self.shared.lock_queue().len()
    }

    /// Wait until every job submitted so far has been processed.
    pub async fn drain(&self) {
        let mut rx = self.shared.outstanding.subscribe();
        // The sender lives in `shared`, which outlives this borrow.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Stop the worker after the job it is currently running, if any.
    /// Jobs still queued are dropped without running.
    pub async fn shutdown(mut self) {
        self.signal_shutdown();
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                warn!(error = %err, "scheduler worker ended abnormally");
            }
        }
        let dropped = self.pending_count();
        if dropped > 0 {
            warn!(dropped, "scheduler shut down with queued jobs");
        }
    }

    fn signal_shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.wakeup.notify_one();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.signal_shutdown();
        }
    }
}
