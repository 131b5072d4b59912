// src/scan/mod.rs

//! Sweep execution engine.
//!
//! - [`action`]: setters, getters and functions, the units a plan is made of.
//! - [`builder`]: turns ordered [`ScanItem`]s into an immutable [`Scan`].
//! - [`runner`]: depth-first nested-loop execution of one run.
//! - [`sink`]: where records go ([`ResultSink`], [`MemoryDataset`]).
//! - [`sequence`]: multi-axis sequences expanded into setters.
//! - [`flow`]: explicit loop-break / abort outcomes.
//! - [`progress`]: progress reporting.
//! - [`sweeps`]: linear sweep helpers and `doNd` shorthands.

pub mod action;
pub mod builder;
pub mod error;
pub mod flow;
pub mod progress;
pub mod runner;
pub mod sequence;
pub mod sink;
pub mod sweeps;

pub use action::{Action, CallContext, Function, Getter, LastValues, SequenceFunction, Setter};
pub use builder::{SEQUENCE_SNAPSHOT_KEY, Scan, ScanBuilder, ScanItem};
pub use error::{EndpointOp, Interrupted, RestoreFailure, ScanError};
pub use flow::{Flow, LoopBreak};
pub use progress::{LogProgress, ProgressReporter, ProgressStats};
pub use runner::{ActionStats, RunOutcome, RunReport};
pub use sequence::{AxisRef, Sequence, SequenceAxis};
pub use sink::{MemoryDataset, Record, ResultSink, Setpoint, SharedDataset, SinkState};
pub use sweeps::{do0d, do1d, do2d, linspace, sweep};
