// src/scan/runner.rs

//! Recursive nested-loop executor for a scan's action plan.
//!
//! One [`Runner`] exists per run. It walks the plan depth-first:
//! - a setter iterates its values and recurses once per value, advancing
//!   the axis cursor;
//! - getters and functions run once and recurse with the same cursor;
//! - reaching the end of the plan completes one innermost iteration.
//!
//! Loop breaks and aborts travel back up the recursion as [`Flow`] values.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, trace, warn};

use crate::endpoint::{EndpointRef, same_endpoint};
use crate::engine::CancelToken;
use crate::scan::action::{Action, CallContext, Function, Getter, LastValues, Setter};
use crate::scan::error::{EndpointOp, Interrupted, RestoreFailure, ScanError};
use crate::scan::flow::Flow;
use crate::scan::progress::ProgressReporter;
use crate::scan::sink::{ResultSink, Setpoint};
use crate::types::Value;

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every point of the plan was visited.
    Completed,
    /// A loop break unwound past the outermost setter.
    Broken,
    /// A function requested the run to stop.
    Aborted,
}

/// Cumulative timing of one action of the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionStats {
    pub name: String,
    pub count: u64,
    pub total: Duration,
}

impl ActionStats {
    /// Mean duration per invocation in milliseconds (0 if never invoked).
    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total.as_secs_f64() * 1000.0 / self.count as f64
    }
}

/// Summary of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub completed_points: u64,
    pub total_points: u64,
    pub duration: Duration,
    pub outcome: RunOutcome,
    pub action_stats: Vec<ActionStats>,
    /// Time spent forwarding records to the sink.
    pub store_duration: Duration,
}

impl RunReport {
    /// Mean wall time per completed point in milliseconds.
    pub fn ms_per_point(&self) -> f64 {
        if self.completed_points == 0 {
            return 0.0;
        }
        self.duration.as_secs_f64() * 1000.0 / self.completed_points as f64
    }
}

pub(crate) struct Runner<'a, 'p> {
    actions: &'a [Action],
    sink: &'a mut dyn ResultSink,
    progress: Option<&'p mut dyn ProgressReporter>,
    cancel: &'a CancelToken,
    total_points: u64,
    setpoints: Vec<Setpoint>,
    measured: LastValues,
    stats: Vec<ActionStats>,
    store_duration: Duration,
    completed: u64,
}

impl<'a, 'p> Runner<'a, 'p> {
    pub(crate) fn new(
        actions: &'a [Action],
        loop_shape: &[usize],
        sink: &'a mut dyn ResultSink,
        progress: Option<&'p mut dyn ProgressReporter>,
        cancel: &'a CancelToken,
    ) -> Self {
        let setpoints = actions
            .iter()
            .filter_map(|a| match a {
                Action::Setter(s) => Some(Setpoint {
                    name: s.endpoint.name().to_string(),
                    value: None,
                }),
                _ => None,
            })
            .collect();
        let stats = actions
            .iter()
            .map(|a| ActionStats {
                name: a.name().to_string(),
                count: 0,
                total: Duration::ZERO,
            })
            .collect();

        Self {
            actions,
            sink,
            progress,
            cancel,
            total_points: loop_shape.iter().map(|&n| n as u64).product(),
            setpoints,
            measured: LastValues::new(),
            stats,
            store_duration: Duration::ZERO,
            completed: 0,
        }
    }

    /// Execute the plan once.
    ///
    /// With `reset_param`, every resetable setter's endpoint is read before the
    /// first action and written back afterwards, whatever the outcome.
    pub(crate) fn run(mut self, reset_param: bool) -> Result<RunReport, ScanError> {
        let started = Instant::now();

        let start_values = if reset_param {
            match self.start_values() {
                Ok(values) => values,
                Err(err) => {
                    self.close_progress();
                    return Err(err);
                }
            }
        } else {
            Vec::new()
        };

        let result = self.visit(0, 0);
        if result.is_err() {
            warn!(
                completed = self.completed,
                "measurement stopped at {}",
                self.describe_setpoints()
            );
        }

        self.close_progress();
        let failures = restore(&start_values);

        let flow = result?;
        if !failures.is_empty() {
            return Err(ScanError::Restore(failures));
        }

        let outcome = match flow {
            Flow::Continue => RunOutcome::Completed,
            Flow::Break(_) => RunOutcome::Broken,
            Flow::Abort => RunOutcome::Aborted,
        };

        Ok(RunReport {
            completed_points: self.completed,
            total_points: self.total_points,
            duration: started.elapsed(),
            outcome,
            action_stats: self.stats,
            store_duration: self.store_duration,
        })
    }

    fn start_values(&self) -> Result<Vec<(EndpointRef, Value)>, ScanError> {
        let mut values: Vec<(EndpointRef, Value)> = Vec::new();
        for action in self.actions {
            let Action::Setter(setter) = action else {
                continue;
            };
            // An endpoint swept by two setters keeps the value it had before
            // the first of them.
            if !setter.resetable
                || values.iter().any(|(ep, _)| same_endpoint(ep, &setter.endpoint))
            {
                continue;
            }
            let value = setter.endpoint.read().map_err(|source| ScanError::Endpoint {
                endpoint: setter.endpoint.name().to_string(),
                operation: EndpointOp::ReadingStartValue,
                last_value: None,
                source,
            })?;
            debug!(endpoint = %setter.endpoint.name(), %value, "start value recorded");
            values.push((setter.endpoint.clone(), value));
        }
        Ok(values)
    }

    fn visit(&mut self, iaction: usize, iparam: usize) -> Result<Flow, ScanError> {
        let actions = self.actions;
        let Some(action) = actions.get(iaction) else {
            self.complete_point();
            return Ok(Flow::Continue);
        };

        let t_start = Instant::now();
        let flow = match action {
            Action::Setter(setter) => return self.visit_setter(setter, iaction, iparam),
            Action::Getter(getter) => self.get(getter)?,
            Action::Function(function) => self.call(function)?,
            Action::SequenceFunction(sf) => self.call(&sf.function)?,
        };

        let flow = match flow {
            Flow::Continue => {
                pause(action.delay());
                self.account(iaction, t_start);
                self.visit(iaction + 1, iparam)?
            }
            other => other,
        };

        if let Flow::Break(_) = flow {
            for slot in self.setpoints.iter_mut().skip(iparam) {
                slot.value = None;
            }
        }
        Ok(flow)
    }

    fn visit_setter(&mut self, setter: &Setter, iaction: usize, iparam: usize) -> Result<Flow, ScanError> {
        for value in &setter.values {
            let t_start = Instant::now();
            let realized = self.apply(setter, value)?;
            self.setpoints[iparam].value = Some(realized);
            pause(setter.delay);
            self.account(iaction, t_start);

            match self.visit(iaction + 1, iparam + 1)? {
                Flow::Continue => {}
                Flow::Break(mut signal) => {
                    if signal.absorb() {
                        trace!(setter = %setter.name, "loop break absorbed");
                        break;
                    }
                    return Ok(Flow::Break(signal));
                }
                Flow::Abort => return Ok(Flow::Abort),
            }
        }
        Ok(Flow::Continue)
    }

    /// Write `value` and read back what the endpoint actually holds.
    fn apply(&self, setter: &Setter, value: &Value) -> Result<Value, ScanError> {
        let endpoint = &setter.endpoint;
        endpoint.write(value).map_err(|source| ScanError::Endpoint {
            endpoint: endpoint.name().to_string(),
            operation: EndpointOp::Setting,
            last_value: Some(value.clone()),
            source,
        })?;
        endpoint.read().map_err(|source| ScanError::Endpoint {
            endpoint: endpoint.name().to_string(),
            operation: EndpointOp::ReadingBack,
            last_value: Some(value.clone()),
            source,
        })
    }

    fn get(&mut self, getter: &Getter) -> Result<Flow, ScanError> {
        let endpoint = &getter.endpoint;
        let value = endpoint.read().map_err(|source| ScanError::Endpoint {
            endpoint: endpoint.name().to_string(),
            operation: EndpointOp::Getting,
            last_value: self.measured.get(endpoint.name()).cloned(),
            source,
        })?;
        self.measured.insert(endpoint.name().to_string(), value.clone());

        let t_store = Instant::now();
        self.sink
            .record(endpoint, &value, &self.setpoints)
            .map_err(ScanError::Sink)?;
        self.store_duration += t_store.elapsed();

        Ok(Flow::Continue)
    }

    fn call(&mut self, function: &Function) -> Result<Flow, ScanError> {
        let last_values = function.add_last_values.then(|| self.last_values());
        let ctx = CallContext {
            dataset: if function.add_dataset {
                Some(&*self.sink)
            } else {
                None
            },
            last_values: last_values.as_ref(),
            cancel: self.cancel,
        };

        (function.callable)(&ctx).map_err(|source| {
            if source.downcast_ref::<Interrupted>().is_some() {
                ScanError::Interrupted
            } else {
                ScanError::Function {
                    name: function.name.clone(),
                    source,
                }
            }
        })
    }

    /// Current setpoints followed by the latest measured values.
    fn last_values(&self) -> LastValues {
        let mut values: LastValues = self
            .setpoints
            .iter()
            .filter_map(|s| s.value.clone().map(|v| (s.name.clone(), v)))
            .collect();
        values.extend(self.measured.iter().map(|(k, v)| (k.clone(), v.clone())));
        values
    }

    fn account(&mut self, iaction: usize, t_start: Instant) {
        let stats = &mut self.stats[iaction];
        stats.total += t_start.elapsed();
        stats.count += 1;
    }

    fn complete_point(&mut self) {
        self.completed += 1;
        if let Some(progress) = self.progress.as_deref_mut() {
            progress.advance(1);
        }

        if tracing::enabled!(tracing::Level::TRACE) {
            let actions = self
                .stats
                .iter()
                .map(|s| format!("{}: {:.1}", s.name, s.mean_ms()))
                .collect::<Vec<_>>()
                .join(", ");
            let store_ms = self.store_duration.as_secs_f64() * 1000.0 / self.completed as f64;
            trace!(npt = self.completed, "actions: {{{actions}}} store: {store_ms:.1} ms");
        }
    }

    fn close_progress(&mut self) {
        if let Some(progress) = self.progress.as_deref_mut() {
            progress.close();
        }
    }

    fn describe_setpoints(&self) -> String {
        let parts = self
            .setpoints
            .iter()
            .map(|s| match &s.value {
                Some(v) => format!("{}: {v}", s.name),
                None => format!("{}: -", s.name),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{{parts}}}")
    }
}

/// Write every start value back. Each endpoint is attempted independently.
fn restore(start_values: &[(EndpointRef, Value)]) -> Vec<RestoreFailure> {
    let mut failures = Vec::new();
    for (endpoint, value) in start_values {
        match endpoint.write(value) {
            Ok(()) => debug!(endpoint = %endpoint.name(), %value, "endpoint restored"),
            Err(err) => {
                error!(endpoint = %endpoint.name(), %value, error = %err, "failed to reset parameter");
                failures.push(RestoreFailure {
                    endpoint: endpoint.name().to_string(),
                    value: value.clone(),
                    error: format!("{err:#}"),
                });
            }
        }
    }
    failures
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
