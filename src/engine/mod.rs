// src/engine/mod.rs

//! Job scheduling engine for labscan.
//!
//! This module ties together:
//! - the pure priority queue ([`queue`]) ordering jobs by priority, then by
//!   submission sequence
//! - the registry of cancellable jobs ([`registry`])
//! - the single background worker ([`worker`]) that runs jobs one at a time
//! - the [`Scheduler`] handle callers submit to and cancel through
//!
//! Cancellation is cooperative: a [`CancelToken`] is checked by the worker
//! before a job starts and handed to the job itself while it runs.

use std::fmt;

/// Lower values run first.
pub type Priority = i32;

/// Priority used when the caller does not pick one.
pub const DEFAULT_PRIORITY: Priority = 1;

/// Identity of a submitted job, unique per scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Completed,
    /// The run returned an error or panicked.
    Failed,
    /// Cancelled before the worker started it.
    Skipped,
}

impl JobState {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Skipped
        )
    }
}

pub mod job;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod worker;

pub use job::{CancelToken, Job, JobHandle};
pub use queue::JobQueue;
pub use registry::CancelRegistry;
pub use scheduler::Scheduler;
