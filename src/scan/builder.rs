// src/scan/builder.rs

//! [`Scan`] construction and execution entry points.
//!
//! A scan is built once from an ordered list of [`ScanItem`]s. Building
//! classifies every item, fixes the action plan and registers the dataset
//! schema with the result sink. After that the plan is immutable; every
//! call to [`Scan::run`] drives it with a fresh runner.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::endpoint::EndpointRef;
use crate::engine::{CancelToken, Job, JobHandle, Priority, Scheduler};
use crate::scan::action::{Action, Function, FunctionRole, Getter, SequenceFunction, Setter};
use crate::scan::error::ScanError;
use crate::scan::progress::{LogProgress, ProgressReporter};
use crate::scan::runner::{RunOutcome, RunReport, Runner};
use crate::scan::sequence::Sequence;
use crate::scan::sink::ResultSink;

/// Snapshot key under which a sequence's metadata is stored.
pub const SEQUENCE_SNAPSHOT_KEY: &str = "sequence";

/// One input of a scan, in declaration order.
pub enum ScanItem {
    Setter(Setter),
    Sequence(Arc<dyn Sequence>),
    Getter(Getter),
    Function(Function),
    SequenceFunction(SequenceFunction),
    /// Bare endpoint, measured like a getter.
    Endpoint(EndpointRef),
}

impl From<Setter> for ScanItem {
    fn from(s: Setter) -> Self {
        ScanItem::Setter(s)
    }
}

impl From<Getter> for ScanItem {
    fn from(g: Getter) -> Self {
        ScanItem::Getter(g)
    }
}

impl From<Function> for ScanItem {
    fn from(f: Function) -> Self {
        ScanItem::Function(f)
    }
}

impl From<SequenceFunction> for ScanItem {
    fn from(sf: SequenceFunction) -> Self {
        ScanItem::SequenceFunction(sf)
    }
}

impl From<EndpointRef> for ScanItem {
    fn from(endpoint: EndpointRef) -> Self {
        ScanItem::Endpoint(endpoint)
    }
}

impl From<Arc<dyn Sequence>> for ScanItem {
    fn from(sequence: Arc<dyn Sequence>) -> Self {
        ScanItem::Sequence(sequence)
    }
}

pub struct ScanBuilder<S: ResultSink> {
    sink: S,
    name: Option<String>,
    reset_param: bool,
    silent: bool,
    items: Vec<ScanItem>,
}

impl<S: ResultSink> ScanBuilder<S> {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = (!name.is_empty()).then_some(name);
        self
    }

    /// Restore resetable setters to their pre-run values after each run.
    pub fn reset_param(mut self, reset: bool) -> Self {
        self.reset_param = reset;
        self
    }

    /// Disable progress reporting.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn with(mut self, item: impl Into<ScanItem>) -> Self {
        self.items.push(item.into());
        self
    }

    pub fn build(self) -> Result<Scan<S>, ScanError> {
        let mut sink = self.sink;
        let mut plan = Plan::default();

        for item in self.items {
            match item {
                ScanItem::Setter(setter) => plan.add_setter(&mut sink, setter)?,
                ScanItem::Sequence(sequence) => {
                    // Axis 0 varies fastest, so it has to be the innermost setter.
                    for axis in sequence.axes().into_iter().rev() {
                        let setter = Setter {
                            name: format!("set {}", axis.name()),
                            sequence_axis: Some((axis.dim, axis.name().to_string())),
                            endpoint: axis.endpoint,
                            values: axis.values,
                            delay: Default::default(),
                            resetable: false,
                        };
                        plan.add_setter(&mut sink, setter)?;
                    }
                    plan.actions
                        .push(Action::Function(Function::start_sequence(sequence.clone())));
                    sink.add_snapshot(SEQUENCE_SNAPSHOT_KEY, &sequence.metadata())
                        .map_err(ScanError::Sink)?;
                }
                ScanItem::Getter(getter) => plan.add_getter(&mut sink, getter)?,
                ScanItem::Endpoint(endpoint) => plan.add_getter(&mut sink, Getter::new(endpoint))?,
                ScanItem::SequenceFunction(sf) => plan.insert_sequence_function(sf)?,
                ScanItem::Function(function) => plan.actions.push(Action::Function(function)),
            }
        }

        let name = match self.name {
            Some(name) => name,
            None => plan.default_name(),
        };
        sink.set_name(&name);

        debug!(
            scan = %name,
            actions = plan.actions.len(),
            shape = ?plan.loop_shape,
            "scan built"
        );

        Ok(Scan {
            name,
            actions: plan.actions,
            loop_shape: plan.loop_shape,
            set_endpoints: plan.set_endpoints,
            measured_endpoints: plan.measured_endpoints,
            reset_param: self.reset_param,
            silent: self.silent,
            sink,
        })
    }
}

#[derive(Default)]
struct Plan {
    actions: Vec<Action>,
    loop_shape: Vec<usize>,
    set_endpoints: Vec<EndpointRef>,
    measured_endpoints: Vec<EndpointRef>,
}

impl Plan {
    fn add_setter(&mut self, sink: &mut dyn ResultSink, setter: Setter) -> Result<(), ScanError> {
        sink.register_axis(&setter.endpoint, setter.n_points())
            .map_err(ScanError::Sink)?;
        self.set_endpoints.push(setter.endpoint.clone());
        self.loop_shape.push(setter.n_points());
        self.actions.push(Action::Setter(setter));
        Ok(())
    }

    fn add_getter(&mut self, sink: &mut dyn ResultSink, getter: Getter) -> Result<(), ScanError> {
        sink.register_measurement(&getter.endpoint, &self.set_endpoints)
            .map_err(ScanError::Sink)?;
        self.measured_endpoints.push(getter.endpoint.clone());
        self.actions.push(Action::Getter(getter));
        Ok(())
    }

    /// Insert right after the first sequence-axis setter matching the binding.
    fn insert_sequence_function(&mut self, sf: SequenceFunction) -> Result<(), ScanError> {
        let mut sequence_added = false;
        let mut position = None;

        for (i, action) in self.actions.iter().enumerate() {
            match action {
                Action::Setter(Setter {
                    sequence_axis: Some((dim, name)),
                    ..
                }) if sf.axis.matches(*dim, name) => {
                    position = Some(i);
                    break;
                }
                Action::Function(f) if f.role == FunctionRole::SequenceStart => {
                    sequence_added = true;
                }
                _ => {}
            }
        }

        match position {
            Some(i) => {
                self.actions.insert(i + 1, Action::SequenceFunction(sf));
                Ok(())
            }
            None if sequence_added => Err(ScanError::SequenceAxisNotFound(sf.axis)),
            None => Err(ScanError::SequenceFunctionBeforeSequence),
        }
    }

    fn default_name(&self) -> String {
        if self.set_endpoints.is_empty() {
            let suffix: String = self
                .measured_endpoints
                .first()
                .map(|e| e.name().chars().take(10).collect())
                .unwrap_or_default();
            format!("0D_{suffix}")
        } else {
            format!("{}D_", self.set_endpoints.len())
        }
    }
}

/// A built sweep: an immutable action plan plus the sink receiving its
/// records.
pub struct Scan<S: ResultSink> {
    name: String,
    actions: Vec<Action>,
    loop_shape: Vec<usize>,
    set_endpoints: Vec<EndpointRef>,
    measured_endpoints: Vec<EndpointRef>,
    reset_param: bool,
    silent: bool,
    sink: S,
}

impl<S: ResultSink> fmt::Debug for Scan<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scan")
            .field("name", &self.name)
            .field("actions", &self.actions)
            .field("loop_shape", &self.loop_shape)
            .field("reset_param", &self.reset_param)
            .finish_non_exhaustive()
    }
}

impl<S: ResultSink> Scan<S> {
    pub fn builder(sink: S) -> ScanBuilder<S> {
        ScanBuilder {
            sink,
            name: None,
            reset_param: false,
            silent: false,
            items: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Setter sizes in plan order, outermost first.
    pub fn loop_shape(&self) -> &[usize] {
        &self.loop_shape
    }

    pub fn set_endpoints(&self) -> &[EndpointRef] {
        &self.set_endpoints
    }

    pub fn measured_endpoints(&self) -> &[EndpointRef] {
        &self.measured_endpoints
    }

    /// Number of innermost iterations of a complete run.
    pub fn total_points(&self) -> u64 {
        self.loop_shape.iter().map(|&n| n as u64).product()
    }

    pub fn dataset(&self) -> &S {
        &self.sink
    }

    pub fn into_dataset(self) -> S {
        self.sink
    }

    /// Run synchronously with a token nobody else holds.
    pub fn run(&mut self) -> Result<RunReport, ScanError> {
        self.run_with(&CancelToken::new())
    }

    /// Run synchronously; functions see `cancel` in their call context.
    pub fn run_with(&mut self, cancel: &CancelToken) -> Result<RunReport, ScanError> {
        if self.silent {
            return self.execute(cancel, None);
        }
        let mut progress = LogProgress::new(self.name.clone(), self.total_points());
        self.execute(cancel, Some(&mut progress))
    }

    /// Run synchronously, reporting progress to `progress`.
    pub fn run_with_progress(
        &mut self,
        cancel: &CancelToken,
        progress: &mut dyn ProgressReporter,
    ) -> Result<RunReport, ScanError> {
        self.execute(cancel, Some(progress))
    }

    fn execute(
        &mut self,
        cancel: &CancelToken,
        progress: Option<&mut dyn ProgressReporter>,
    ) -> Result<RunReport, ScanError> {
        info!(scan = %self.name, shape = ?self.loop_shape, "measurement started");

        self.sink.enter().map_err(ScanError::Sink)?;
        let result = Runner::new(
            &self.actions,
            &self.loop_shape,
            &mut self.sink,
            progress,
            cancel,
        )
        .run(self.reset_param);
        let exited = self.sink.exit().map_err(ScanError::Sink);

        match &result {
            Ok(report) => match report.outcome {
                RunOutcome::Completed => info!(
                    scan = %self.name,
                    points = report.completed_points,
                    "Total duration: {:.2} s ({:.1} ms/pt)",
                    report.duration.as_secs_f64(),
                    report.ms_per_point()
                ),
                RunOutcome::Broken => warn!(
                    scan = %self.name,
                    points = report.completed_points,
                    "measurement break"
                ),
                RunOutcome::Aborted => warn!(
                    scan = %self.name,
                    points = report.completed_points,
                    "measurement aborted"
                ),
            },
            Err(ScanError::Interrupted) => warn!(scan = %self.name, "measurement interrupted"),
            Err(err) => error!(scan = %self.name, error = %err, "exception in measurement"),
        }

        let report = result?;
        exited?;
        Ok(report)
    }
}

impl<S: ResultSink + 'static> Scan<S> {
    /// Queue the scan on `scheduler`.
    ///
    /// A check is appended to the plan that aborts the run once the job's
    /// token is cancelled, so a running scan stops at its next innermost
    /// iteration.
    pub fn submit(mut self, scheduler: &Scheduler, priority: Priority) -> JobHandle {
        self.actions.push(Action::Function(Function::cancel_check()));
        scheduler.submit(self, priority)
    }
}

impl<S: ResultSink + 'static> Job for Scan<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, cancel: &CancelToken) -> anyhow::Result<()> {
        self.run_with(cancel)?;
        Ok(())
    }
}
