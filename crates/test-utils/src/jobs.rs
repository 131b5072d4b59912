use std::sync::{Arc, Condvar, Mutex};

use anyhow::{Result, bail};
use labscan::engine::{CancelToken, Job};

/// Names of the jobs that ran, in execution order.
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

pub fn execution_log() -> ExecutionLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// One-shot latch a blocking job can wait on.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }

    /// Block the calling thread until `open` is called.
    pub fn wait(&self) {
        let (lock, cvar) = &*self.inner;
        let mut open = lock.lock().unwrap();
        while !*open {
            open = cvar.wait(open).unwrap();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeed,
    Fail,
    Panic,
}

/// Job that appends its name to a shared log when run.
pub struct RecordingJob {
    name: String,
    log: ExecutionLog,
    gate: Option<Gate>,
    outcome: Outcome,
    saw_cancel: Arc<Mutex<Option<bool>>>,
}

impl RecordingJob {
    pub fn new(name: &str, log: &ExecutionLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            gate: None,
            outcome: Outcome::Succeed,
            saw_cancel: Arc::new(Mutex::new(None)),
        }
    }

    /// Block inside `run` until the gate opens.
    pub fn blocked_on(mut self, gate: &Gate) -> Self {
        self.gate = Some(gate.clone());
        self
    }

    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Whether the token was cancelled when the job finished running
    /// (`None` if it never ran).
    pub fn cancel_observed(&self) -> Arc<Mutex<Option<bool>>> {
        self.saw_cancel.clone()
    }
}

impl Job for RecordingJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, cancel: &CancelToken) -> Result<()> {
        self.log.lock().unwrap().push(self.name.clone());
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        *self.saw_cancel.lock().unwrap() = Some(cancel.is_cancelled());

        match self.outcome {
            Outcome::Succeed => Ok(()),
            Outcome::Fail => bail!("job {} failed on purpose", self.name),
            Outcome::Panic => panic!("job {} panicked on purpose", self.name),
        }
    }
}
