// src/engine/job.rs

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use super::{JobId, JobState, Priority};

/// A unit of work the scheduler runs on a blocking thread.
///
/// `run` is synchronous; long-running jobs should check `cancel` at points
/// where stopping early is safe.
pub trait Job: Send + 'static {
    fn name(&self) -> &str;

    fn run(&mut self, cancel: &CancelToken) -> anyhow::Result<()>;
}

/// Shared cooperative cancellation flag.
///
/// Clones observe the same flag. Cancelling never interrupts anything by
/// itself; it only becomes visible to code that checks it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Caller-side view of a submitted job.
#[derive(Clone)]
pub struct JobHandle {
    pub(crate) id: JobId,
    pub(crate) name: String,
    pub(crate) priority: Priority,
    pub(crate) cancel: CancelToken,
    pub(crate) state: watch::Receiver<JobState>,
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("state", &self.state())
            .finish()
    }
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Set the job's kill flag. A queued job will be skipped; a running one
    /// only notices if it checks its token.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    /// Wait until the job reached a final state.
    ///
    /// If the scheduler goes away first, the last observed state is returned.
    pub async fn wait(&self) -> JobState {
        self.wait_until(JobState::is_finished).await
    }

    /// Wait until the worker has picked the job up (or already finished it).
    pub async fn started(&self) -> JobState {
        self.wait_until(|s| s != JobState::Queued).await
    }

    async fn wait_until(&self, pred: impl Fn(JobState) -> bool) -> JobState {
        let mut rx = self.state.clone();
        let waited = rx.wait_for(|s| pred(*s)).await.map(|s| *s);
        waited.unwrap_or_else(|_| *rx.borrow())
    }
}
