// src/scan/error.rs

//! Errors surfaced by scan construction and execution.

use std::fmt;

use thiserror::Error;

use crate::scan::sequence::AxisRef;
use crate::types::Value;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failure {operation} '{endpoint}' (last value: {}): {source}", display_last(.last_value))]
    Endpoint {
        endpoint: String,
        operation: EndpointOp,
        last_value: Option<Value>,
        #[source]
        source: anyhow::Error,
    },

    #[error("function '{name}' failed: {source}")]
    Function {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("measurement interrupted")]
    Interrupted,

    #[error("failed to restore {} endpoint(s): {}", .0.len(), join_failures(.0))]
    Restore(Vec<RestoreFailure>),

    #[error("result sink error: {0}")]
    Sink(#[source] anyhow::Error),

    #[error("SequenceFunction must be added after sequence")]
    SequenceFunctionBeforeSequence,

    #[error("sequence axis {0} not found in sequence")]
    SequenceAxisNotFound(AxisRef),
}

/// Which endpoint call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointOp {
    Setting,
    ReadingBack,
    Getting,
    ReadingStartValue,
}

impl fmt::Display for EndpointOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EndpointOp::Setting => "setting",
            EndpointOp::ReadingBack => "reading back",
            EndpointOp::Getting => "getting",
            EndpointOp::ReadingStartValue => "reading start value of",
        };
        f.write_str(s)
    }
}

/// One endpoint that could not be returned to its pre-run value.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreFailure {
    pub endpoint: String,
    pub value: Value,
    pub error: String,
}

impl fmt::Display for RestoreFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.endpoint, self.value, self.error)
    }
}

/// Marker error a scan function can return to signal an operator interrupt.
///
/// The runner maps it to [`ScanError::Interrupted`] instead of wrapping it as
/// a function failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "measurement interrupted by operator")
    }
}

impl std::error::Error for Interrupted {}

fn display_last(value: &Option<Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "none".to_string(),
    }
}

fn join_failures(failures: &[RestoreFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
