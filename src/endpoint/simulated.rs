// src/endpoint/simulated.rs

//! In-memory endpoints.
//!
//! These stand in for instrument parameters when no hardware is attached:
//! - [`MemoryParameter`] stores whatever is written, optionally snapped to a
//!   fixed resolution (so read-back differs from the requested value, like a
//!   DAC with finite steps).
//! - [`CounterParameter`] counts how many times it has been read.
//! - [`ElapsedTime`] reports seconds since creation; read-only.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use anyhow::{Result, anyhow, bail};

use super::Endpoint;
use crate::types::Value;

#[derive(Debug)]
pub struct MemoryParameter {
    name: String,
    value: Mutex<Value>,
    resolution: Option<f64>,
}

impl MemoryParameter {
    pub fn new(name: impl Into<String>, initial: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: Mutex::new(initial.into()),
            resolution: None,
        }
    }

    /// Snap numeric writes to multiples of `step`.
    pub fn with_resolution(mut self, step: f64) -> Self {
        self.resolution = Some(step);
        self
    }

    fn quantize(&self, value: &Value) -> Value {
        match (self.resolution, value.as_f64()) {
            (Some(step), Some(v)) if step > 0.0 => Value::Float((v / step).round() * step),
            _ => value.clone(),
        }
    }
}

impl Endpoint for MemoryParameter {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<Value> {
        let guard = self
            .value
            .lock()
            .map_err(|_| anyhow!("parameter '{}' lock poisoned", self.name))?;
        Ok(guard.clone())
    }

    fn write(&self, value: &Value) -> Result<()> {
        let realized = self.quantize(value);
        let mut guard = self
            .value
            .lock()
            .map_err(|_| anyhow!("parameter '{}' lock poisoned", self.name))?;
        *guard = realized;
        Ok(())
    }
}

/// Counts reads; writing an integer resets the count.
#[derive(Debug)]
pub struct CounterParameter {
    name: String,
    count: AtomicI64,
}

impl CounterParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: AtomicI64::new(0),
        }
    }

    /// Number of reads so far (does not count as a read itself).
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }
}

impl Endpoint for CounterParameter {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<Value> {
        Ok(Value::Int(self.count.fetch_add(1, Ordering::SeqCst) + 1))
    }

    fn write(&self, value: &Value) -> Result<()> {
        match value {
            Value::Int(v) => {
                self.count.store(*v, Ordering::SeqCst);
                Ok(())
            }
            other => bail!("counter '{}' only accepts integers, got {other}", self.name),
        }
    }
}

#[derive(Debug)]
pub struct ElapsedTime {
    name: String,
    started: Instant,
}

impl ElapsedTime {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: Instant::now(),
        }
    }
}

impl Endpoint for ElapsedTime {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<Value> {
        Ok(Value::Float(self.started.elapsed().as_secs_f64()))
    }

    fn write(&self, _value: &Value) -> Result<()> {
        bail!("'{}' is read-only", self.name)
    }
}
