// src/scan/action.rs

//! Units of work a scan is made of.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::endpoint::EndpointRef;
use crate::engine::CancelToken;
use crate::scan::flow::Flow;
use crate::scan::sequence::{AxisRef, Sequence};
use crate::scan::sink::ResultSink;
use crate::types::Value;

/// Latest setpoint and measured values, keyed by endpoint name.
pub type LastValues = BTreeMap<String, Value>;

/// Callable wrapped by a [`Function`]. Fixed arguments are captured by the
/// closure.
pub type Callable = Arc<dyn Fn(&CallContext<'_>) -> Result<Flow> + Send + Sync>;

/// What a function sees when it is invoked.
pub struct CallContext<'a> {
    /// The in-progress result sink, when `add_dataset` was requested.
    pub dataset: Option<&'a dyn ResultSink>,
    /// Latest setpoints and measurements, when `add_last_values` was requested.
    pub last_values: Option<&'a LastValues>,
    /// Cancellation token of the job running this scan.
    pub cancel: &'a CancelToken,
}

impl CallContext<'_> {
    /// Shortcut for `last_values[name]`.
    pub fn last_value(&self, name: &str) -> Option<&Value> {
        self.last_values.and_then(|values| values.get(name))
    }
}

/// Applies a sequence of values to an endpoint, one per loop iteration.
#[derive(Clone)]
pub struct Setter {
    pub(crate) name: String,
    pub(crate) endpoint: EndpointRef,
    pub(crate) values: Vec<Value>,
    pub(crate) delay: Duration,
    pub(crate) resetable: bool,
    /// Set for setters generated from a sequence: (dimension, axis name).
    pub(crate) sequence_axis: Option<(usize, String)>,
}

impl Setter {
    pub fn new<V: Into<Value>>(endpoint: EndpointRef, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            name: format!("set {}", endpoint.name()),
            endpoint,
            values: values.into_iter().map(Into::into).collect(),
            delay: Duration::ZERO,
            resetable: true,
            sequence_axis: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn resetable(mut self, resetable: bool) -> Self {
        self.resetable = resetable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &EndpointRef {
        &self.endpoint
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn n_points(&self) -> usize {
        self.values.len()
    }

    pub fn is_resetable(&self) -> bool {
        self.resetable
    }
}

/// Reads an endpoint once per invocation and records the value.
#[derive(Clone)]
pub struct Getter {
    pub(crate) name: String,
    pub(crate) endpoint: EndpointRef,
    pub(crate) delay: Duration,
}

impl Getter {
    pub fn new(endpoint: EndpointRef) -> Self {
        Self {
            name: format!("get {}", endpoint.name()),
            endpoint,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &EndpointRef {
        &self.endpoint
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FunctionRole {
    User,
    /// Starts a sequence; marks where a sequence was added to the plan.
    SequenceStart,
    /// Checks the job's cancellation token; appended on submit.
    CancelCheck,
}

/// Side-effecting callable.
#[derive(Clone)]
pub struct Function {
    pub(crate) name: String,
    pub(crate) callable: Callable,
    pub(crate) delay: Duration,
    pub(crate) add_dataset: bool,
    pub(crate) add_last_values: bool,
    pub(crate) role: FunctionRole,
}

impl Function {
    pub fn new<F>(name: &str, f: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> Result<Flow> + Send + Sync + 'static,
    {
        Self {
            name: format!("do {name}"),
            callable: Arc::new(f),
            delay: Duration::ZERO,
            add_dataset: false,
            add_last_values: false,
            role: FunctionRole::User,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Pass the in-progress result sink to the callable.
    pub fn add_dataset(mut self) -> Self {
        self.add_dataset = true;
        self
    }

    /// Pass the latest setpoint and measured values to the callable.
    pub fn add_last_values(mut self) -> Self {
        self.add_last_values = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn start_sequence(sequence: Arc<dyn Sequence>) -> Self {
        let name = format!("start {}", sequence.name());
        let mut f = Self::new(&name, move |_ctx| {
            sequence.start()?;
            Ok(Flow::Continue)
        });
        f.name = name;
        f.role = FunctionRole::SequenceStart;
        f
    }

    pub(crate) fn cancel_check() -> Self {
        let mut f = Self::new("abort_measurement", |ctx| {
            if ctx.cancel.is_cancelled() {
                Ok(Flow::Abort)
            } else {
                Ok(Flow::Continue)
            }
        });
        f.role = FunctionRole::CancelCheck;
        f
    }
}

/// Function that must run right after a given sequence axis has been set and
/// before the sequence is played.
#[derive(Clone)]
pub struct SequenceFunction {
    pub(crate) function: Function,
    pub(crate) axis: AxisRef,
}

impl SequenceFunction {
    pub fn new(function: Function, axis: impl Into<AxisRef>) -> Self {
        Self {
            function,
            axis: axis.into(),
        }
    }

    pub fn axis(&self) -> &AxisRef {
        &self.axis
    }

    pub fn function(&self) -> &Function {
        &self.function
    }
}

/// One step of a scan's action plan.
#[derive(Clone)]
pub enum Action {
    Setter(Setter),
    Getter(Getter),
    Function(Function),
    SequenceFunction(SequenceFunction),
}

impl Action {
    pub fn name(&self) -> &str {
        match self {
            Action::Setter(s) => &s.name,
            Action::Getter(g) => &g.name,
            Action::Function(f) => &f.name,
            Action::SequenceFunction(sf) => &sf.function.name,
        }
    }

    pub fn delay(&self) -> Duration {
        match self {
            Action::Setter(s) => s.delay,
            Action::Getter(g) => g.delay,
            Action::Function(f) => f.delay,
            Action::SequenceFunction(sf) => sf.function.delay,
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Setter(s) => f
                .debug_struct("Setter")
                .field("name", &s.name)
                .field("n_points", &s.values.len())
                .field("resetable", &s.resetable)
                .finish(),
            Action::Getter(g) => f.debug_struct("Getter").field("name", &g.name).finish(),
            Action::Function(func) => f.debug_struct("Function").field("name", &func.name).finish(),
            Action::SequenceFunction(sf) => f
                .debug_struct("SequenceFunction")
                .field("name", &sf.function.name)
                .field("axis", &sf.axis)
                .finish(),
        }
    }
}
