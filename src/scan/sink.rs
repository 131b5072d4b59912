// src/scan/sink.rs

//! Result sink contract and an in-memory dataset.
//!
//! The sweep engine never persists data. It registers the dataset schema
//! while a scan is built and then streams one record per getter invocation
//! into a [`ResultSink`]. Storage backends (SQL, HDF5, ...) implement the
//! trait outside this crate; [`MemoryDataset`] keeps everything in memory.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Result, bail};

use crate::endpoint::EndpointRef;
use crate::types::Value;

/// Current value of one sweep axis. `value` is `None` while the axis has not
/// been set yet, or after a loop break abandoned it.
#[derive(Debug, Clone, PartialEq)]
pub struct Setpoint {
    pub name: String,
    pub value: Option<Value>,
}

pub trait ResultSink: Send {
    /// Final scan name, decided once the scan is built.
    fn set_name(&mut self, _name: &str) {}

    /// Declare a sweep axis. Called once per setter, in plan order.
    fn register_axis(&mut self, endpoint: &EndpointRef, size: usize) -> Result<()>;

    /// Declare a measured endpoint together with the axes declared before it.
    fn register_measurement(&mut self, endpoint: &EndpointRef, axes: &[EndpointRef]) -> Result<()>;

    /// Attach metadata (e.g. a sequence description).
    fn add_snapshot(&mut self, _key: &str, _snapshot: &BTreeMap<String, String>) -> Result<()> {
        Ok(())
    }

    /// Called before the first record of a run.
    fn enter(&mut self) -> Result<()>;

    /// One measured value against the full setpoint vector.
    fn record(&mut self, endpoint: &EndpointRef, value: &Value, setpoints: &[Setpoint]) -> Result<()>;

    /// Called after the run on every path, success or failure.
    fn exit(&mut self) -> Result<()>;

    /// Number of records written so far, for functions that inspect the
    /// in-progress dataset.
    fn record_count(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisInfo {
    pub name: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementInfo {
    pub name: String,
    /// Names of the axes the measurement depends on.
    pub axes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub value: Value,
    pub setpoints: Vec<Setpoint>,
}

impl Record {
    /// Setpoint values in axis order; unset axes are skipped.
    pub fn setpoint_values(&self) -> Vec<Value> {
        self.setpoints
            .iter()
            .filter_map(|s| s.value.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkState {
    #[default]
    Building,
    Open,
    Closed,
}

/// Dataset kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryDataset {
    name: String,
    axes: Vec<AxisInfo>,
    measurements: Vec<MeasurementInfo>,
    snapshots: BTreeMap<String, BTreeMap<String, String>>,
    records: Vec<Record>,
    state: SinkState,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle, so the dataset stays reachable after the scan has been
    /// handed to the scheduler.
    pub fn shared() -> SharedDataset {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn axes(&self) -> &[AxisInfo] {
        &self.axes
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.size).collect()
    }

    pub fn measurements(&self) -> &[MeasurementInfo] {
        &self.measurements
    }

    pub fn snapshot(&self, key: &str) -> Option<&BTreeMap<String, String>> {
        self.snapshots.get(key)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records of one measured endpoint, in acquisition order.
    pub fn records_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |r| r.name == name)
    }

    pub fn state(&self) -> SinkState {
        self.state
    }
}

impl ResultSink for MemoryDataset {
    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn register_axis(&mut self, endpoint: &EndpointRef, size: usize) -> Result<()> {
        self.axes.push(AxisInfo {
            name: endpoint.name().to_string(),
            size,
        });
        Ok(())
    }

    fn register_measurement(&mut self, endpoint: &EndpointRef, axes: &[EndpointRef]) -> Result<()> {
        self.measurements.push(MeasurementInfo {
            name: endpoint.name().to_string(),
            axes: axes.iter().map(|a| a.name().to_string()).collect(),
        });
        Ok(())
    }

    fn add_snapshot(&mut self, key: &str, snapshot: &BTreeMap<String, String>) -> Result<()> {
        self.snapshots.insert(key.to_string(), snapshot.clone());
        Ok(())
    }

    fn enter(&mut self) -> Result<()> {
        if self.state == SinkState::Open {
            bail!("dataset '{}' is already open", self.name);
        }
        self.state = SinkState::Open;
        Ok(())
    }

    fn record(&mut self, endpoint: &EndpointRef, value: &Value, setpoints: &[Setpoint]) -> Result<()> {
        if self.state != SinkState::Open {
            bail!("dataset '{}' is not open for writing", self.name);
        }
        self.records.push(Record {
            name: endpoint.name().to_string(),
            value: value.clone(),
            setpoints: setpoints.to_vec(),
        });
        Ok(())
    }

    fn exit(&mut self) -> Result<()> {
        self.state = SinkState::Closed;
        Ok(())
    }

    fn record_count(&self) -> usize {
        self.records.len()
    }
}

pub type SharedDataset = Arc<Mutex<MemoryDataset>>;

/// A sink behind a mutex can be shared between the scan and its owner.
impl<S: ResultSink> ResultSink for Arc<Mutex<S>> {
    fn set_name(&mut self, name: &str) {
        self.lock().unwrap_or_else(PoisonError::into_inner).set_name(name)
    }

    fn register_axis(&mut self, endpoint: &EndpointRef, size: usize) -> Result<()> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register_axis(endpoint, size)
    }

    fn register_measurement(&mut self, endpoint: &EndpointRef, axes: &[EndpointRef]) -> Result<()> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register_measurement(endpoint, axes)
    }

    fn add_snapshot(&mut self, key: &str, snapshot: &BTreeMap<String, String>) -> Result<()> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_snapshot(key, snapshot)
    }

    fn enter(&mut self) -> Result<()> {
        self.lock().unwrap_or_else(PoisonError::into_inner).enter()
    }

    fn record(&mut self, endpoint: &EndpointRef, value: &Value, setpoints: &[Setpoint]) -> Result<()> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(endpoint, value, setpoints)
    }

    fn exit(&mut self) -> Result<()> {
        self.lock().unwrap_or_else(PoisonError::into_inner).exit()
    }

    fn record_count(&self) -> usize {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_count()
    }
}
