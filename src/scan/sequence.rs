// src/scan/sequence.rs

//! Multi-axis sequences (e.g. pulse sequences produced by a waveform
//! generator) that arrive in a scan as a single input.
//!
//! A sequence exposes its sweep axes in declared order, axis 0 being the
//! fastest varying one. The scan builder turns every axis into a setter and
//! appends a function that starts the sequence once per point.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;

use crate::endpoint::EndpointRef;
use crate::types::Value;

/// One sweep axis of a sequence.
#[derive(Clone)]
pub struct SequenceAxis {
    /// Dimension index inside the sequence (0 = fastest).
    pub dim: usize,
    /// Index parameter that selects the point on this axis.
    pub endpoint: EndpointRef,
    pub values: Vec<Value>,
}

impl SequenceAxis {
    pub fn name(&self) -> &str {
        self.endpoint.name()
    }
}

impl fmt::Debug for SequenceAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceAxis")
            .field("dim", &self.dim)
            .field("name", &self.name())
            .field("points", &self.values.len())
            .finish()
    }
}

/// External sequence contract.
pub trait Sequence: Send + Sync {
    fn name(&self) -> &str;

    /// Sweep axes in declared order.
    fn axes(&self) -> Vec<SequenceAxis>;

    /// Upload and play the sequence for the currently selected indices.
    fn start(&self) -> Result<()>;

    /// Metadata recorded as a snapshot in the result sink.
    fn metadata(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// Reference to a sequence axis, by dimension index or by axis name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisRef {
    Index(usize),
    Name(String),
}

impl AxisRef {
    pub(crate) fn matches(&self, dim: usize, name: &str) -> bool {
        match self {
            AxisRef::Index(i) => *i == dim,
            AxisRef::Name(n) => n == name,
        }
    }
}

impl fmt::Display for AxisRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisRef::Index(i) => write!(f, "{i}"),
            AxisRef::Name(n) => write!(f, "'{n}'"),
        }
    }
}

impl From<usize> for AxisRef {
    fn from(i: usize) -> Self {
        AxisRef::Index(i)
    }
}

impl From<&str> for AxisRef {
    fn from(n: &str) -> Self {
        AxisRef::Name(n.to_string())
    }
}

impl From<String> for AxisRef {
    fn from(n: String) -> Self {
        AxisRef::Name(n)
    }
}
