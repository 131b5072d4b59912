// src/config/model.rs

use serde::Deserialize;

use crate::engine::{DEFAULT_PRIORITY, Priority};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [scheduler]
/// default_priority = 1
///
/// [[endpoint]]
/// name = "gate"
/// kind = "memory"
/// initial = 0.0
///
/// [[endpoint]]
/// name = "counter"
/// kind = "counter"
///
/// [[scan]]
/// name = "gate sweep"
/// reset_param = true
/// measure = ["counter"]
///
/// [[scan.sweep]]
/// endpoint = "gate"
/// start = 0.0
/// stop = 1.0
/// n_points = 11
/// ```
///
/// Nothing here has been cross-checked yet; [`ConfigFile`] is the validated
/// form (see `validate.rs`).
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub endpoint: Vec<EndpointConfig>,

    #[serde(default)]
    pub scan: Vec<ScanConfig>,
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Priority of scans that don't set their own. Lower runs first.
    #[serde(default = "default_priority")]
    pub default_priority: Priority,
}

fn default_priority() -> Priority {
    DEFAULT_PRIORITY
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            default_priority: default_priority(),
        }
    }
}

/// Kind of simulated endpoint backing a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// Holds the last written value.
    Memory,
    /// Counts its reads.
    Counter,
    /// Seconds since creation; read-only.
    Elapsed,
}

impl EndpointKind {
    /// Only memory endpoints accept arbitrary floats from a linear sweep.
    pub fn is_sweepable(self) -> bool {
        matches!(self, EndpointKind::Memory)
    }
}

/// `[[endpoint]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub name: String,

    #[serde(default = "default_kind")]
    pub kind: EndpointKind,

    /// Initial value (memory endpoints only).
    #[serde(default)]
    pub initial: f64,

    /// Write quantization step (memory endpoints only).
    #[serde(default)]
    pub resolution: Option<f64>,
}

fn default_kind() -> EndpointKind {
    EndpointKind::Memory
}

/// `[[scan]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// If absent, the scan derives a name from its shape.
    #[serde(default)]
    pub name: Option<String>,

    /// Falls back to `[scheduler].default_priority`.
    #[serde(default)]
    pub priority: Option<Priority>,

    #[serde(default)]
    pub reset_param: bool,

    #[serde(default)]
    pub silent: bool,

    /// Swept axes, outermost first.
    #[serde(default)]
    pub sweep: Vec<SweepConfig>,

    /// Endpoints read at every point.
    #[serde(default)]
    pub measure: Vec<String>,
}

/// `[[scan.sweep]]` entry: a linear sweep of one endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    pub endpoint: String,
    pub start: f64,
    pub stop: f64,
    pub n_points: usize,

    /// Pause after each write, in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,

    #[serde(default = "default_resetable")]
    pub resetable: bool,
}

fn default_resetable() -> bool {
    true
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>`, so every scan
/// references declared endpoints and every sweep is well formed.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerSection,
    pub endpoint: Vec<EndpointConfig>,
    pub scan: Vec<ScanConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerSection,
        endpoint: Vec<EndpointConfig>,
        scan: Vec<ScanConfig>,
    ) -> Self {
        Self {
            scheduler,
            endpoint,
            scan,
        }
    }

    pub fn endpoint_config(&self, name: &str) -> Option<&EndpointConfig> {
        self.endpoint.iter().find(|e| e.name == name)
    }

    /// Priority a scan is submitted with.
    pub fn priority_of(&self, scan: &ScanConfig) -> Priority {
        scan.priority.unwrap_or(self.scheduler.default_priority)
    }
}
