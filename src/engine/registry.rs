// src/engine/registry.rs

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::JobId;
use super::job::CancelToken;

/// Tokens of every job that has been submitted but not yet finished.
#[derive(Debug, Default)]
pub struct CancelRegistry {
    tokens: Mutex<HashMap<JobId, CancelToken>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, CancelToken>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, id: JobId, token: CancelToken) {
        self.lock().insert(id, token);
    }

    /// Returns false if the job was no longer registered (e.g. after
    /// `cancel_all`).
    pub fn unregister(&self, id: JobId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Cancel one job. Returns false if it already finished.
    pub fn cancel(&self, id: JobId) -> bool {
        match self.lock().get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every registered job, clear the registry and return how many
    /// were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        for (id, token) in &drained {
            debug!(%id, "cancelling job");
            token.cancel();
        }
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
