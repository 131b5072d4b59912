// src/engine/worker.rs

//! The single background worker that drains the job queue.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::job::{CancelToken, Job};
use super::queue::JobQueue;
use super::registry::CancelRegistry;
use super::{JobId, JobState, Priority};

/// A job waiting in the queue, together with everything the worker needs to
/// report on it.
pub(crate) struct QueuedJob {
    pub(crate) id: JobId,
    pub(crate) priority: Priority,
    pub(crate) job: Box<dyn Job>,
    pub(crate) cancel: CancelToken,
    pub(crate) state: watch::Sender<JobState>,
}

/// State shared between the scheduler handle and its worker.
pub(crate) struct Shared {
    pub(crate) queue: Mutex<JobQueue<QueuedJob>>,
    pub(crate) registry: CancelRegistry,
    pub(crate) wakeup: Notify,
    pub(crate) shutdown: AtomicBool,
    /// Submitted jobs the worker has not finished processing yet.
    pub(crate) outstanding: watch::Sender<usize>,
    pub(crate) next_id: AtomicU64,
}

impl Shared {
    pub(crate) fn new() -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            queue: Mutex::new(JobQueue::new()),
            registry: CancelRegistry::new(),
            wakeup: Notify::new(),
            shutdown: AtomicBool::new(false),
            outstanding,
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn lock_queue(&self) -> MutexGuard<'_, JobQueue<QueuedJob>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Spawn the worker loop.
///
/// The loop pops the next job when there is one and otherwise blocks on
/// `wakeup` until a submit (or shutdown) notifies it. Jobs run one at a time
/// on tokio's blocking pool; the loop awaits each before popping the next.
pub(crate) fn spawn_worker(shared: Arc<Shared>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("scheduler worker started");

        loop {
            if shared.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let next = shared.lock_queue().pop();
            match next {
                Some(job) => process(&shared, job).await,
                None => shared.wakeup.notified().await,
            }
        }

        info!("scheduler worker stopped");
    })
}

async fn process(shared: &Shared, queued: QueuedJob) {
    let QueuedJob {
        id,
        priority,
        mut job,
        cancel,
        state,
    } = queued;
    let name = job.name().to_string();

    let final_state = if cancel.is_cancelled() {
        info!(%id, job = %name, "job cancelled before start; skipping");
        JobState::Skipped
    } else {
        info!(%id, job = %name, priority, "job started");
        state.send_replace(JobState::Running);

        let token = cancel.clone();
        let outcome = tokio::task::spawn_blocking(move || job.run(&token)).await;

        match outcome {
            Ok(Ok(())) => {
                info!(%id, job = %name, "job completed");
                JobState::Completed
            }
            Ok(Err(err)) => {
                error!(%id, job = %name, error = %format!("{err:#}"), "job failed");
                JobState::Failed
            }
            Err(join_err) => {
                error!(%id, job = %name, error = %join_err, "job panicked");
                JobState::Failed
            }
        }
    };

    if !shared.registry.unregister(id) {
        debug!(%id, job = %name, "job was already removed from the cancel registry");
    }
    state.send_replace(final_state);
    shared.outstanding.send_modify(|n| *n = n.saturating_sub(1));
}
