use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use labscan::endpoint::{Endpoint, EndpointRef};
use labscan::types::Value;

/// Endpoint that holds a value and remembers every write.
#[derive(Debug)]
pub struct RecordingEndpoint {
    name: String,
    value: Mutex<Value>,
    writes: Mutex<Vec<Value>>,
    reads: AtomicUsize,
}

impl RecordingEndpoint {
    pub fn new(name: &str, initial: impl Into<Value>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            value: Mutex::new(initial.into()),
            writes: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
        })
    }

    pub fn value(&self) -> Value {
        self.value.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Value> {
        self.writes.lock().unwrap().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl Endpoint for RecordingEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<Value> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.value.lock().unwrap().clone())
    }

    fn write(&self, value: &Value) -> Result<()> {
        self.writes.lock().unwrap().push(value.clone());
        *self.value.lock().unwrap() = value.clone();
        Ok(())
    }
}

/// Endpoint that starts failing after a number of successful calls.
#[derive(Debug)]
pub struct FailingEndpoint {
    name: String,
    value: Mutex<Value>,
    reads_left: Mutex<Option<usize>>,
    writes_left: Mutex<Option<usize>>,
}

impl FailingEndpoint {
    pub fn new(name: &str, initial: impl Into<Value>) -> Self {
        Self {
            name: name.to_string(),
            value: Mutex::new(initial.into()),
            reads_left: Mutex::new(None),
            writes_left: Mutex::new(None),
        }
    }

    /// Reads succeed `n` times, then fail.
    pub fn fail_reads_after(self, n: usize) -> Self {
        *self.reads_left.lock().unwrap() = Some(n);
        self
    }

    /// Writes succeed `n` times, then fail.
    pub fn fail_writes_after(self, n: usize) -> Self {
        *self.writes_left.lock().unwrap() = Some(n);
        self
    }

    pub fn into_ref(self) -> EndpointRef {
        Arc::new(self)
    }

    fn take(budget: &Mutex<Option<usize>>) -> bool {
        let mut budget = budget.lock().unwrap();
        match budget.as_mut() {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }
}

impl Endpoint for FailingEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<Value> {
        if !Self::take(&self.reads_left) {
            bail!("{}: simulated read failure", self.name);
        }
        Ok(self.value.lock().unwrap().clone())
    }

    fn write(&self, value: &Value) -> Result<()> {
        if !Self::take(&self.writes_left) {
            bail!("{}: simulated write failure", self.name);
        }
        *self.value.lock().unwrap() = value.clone();
        Ok(())
    }
}
