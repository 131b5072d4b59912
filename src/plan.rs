// src/plan.rs

//! Turns a validated config into simulated endpoints and ready-to-submit
//! scans.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConfigFile, EndpointConfig, EndpointKind, ScanConfig};
use crate::endpoint::{CounterParameter, ElapsedTime, EndpointRef, MemoryParameter};
use crate::engine::Priority;
use crate::errors::{LabscanError, Result};
use crate::scan::{MemoryDataset, Scan, SharedDataset, sweep};

/// A scan built from config, with the handle to its dataset.
#[derive(Debug)]
pub struct PlannedScan {
    pub scan: Scan<SharedDataset>,
    pub dataset: SharedDataset,
    pub priority: Priority,
}

/// One simulated endpoint per `[[endpoint]]` entry, keyed by name.
pub fn build_endpoints(cfg: &ConfigFile) -> BTreeMap<String, EndpointRef> {
    cfg.endpoint
        .iter()
        .map(|ep| (ep.name.clone(), build_endpoint(ep)))
        .collect()
}

fn build_endpoint(cfg: &EndpointConfig) -> EndpointRef {
    match cfg.kind {
        EndpointKind::Memory => {
            let mut param = MemoryParameter::new(cfg.name.clone(), cfg.initial);
            if let Some(step) = cfg.resolution {
                param = param.with_resolution(step);
            }
            Arc::new(param)
        }
        EndpointKind::Counter => Arc::new(CounterParameter::new(cfg.name.clone())),
        EndpointKind::Elapsed => Arc::new(ElapsedTime::new(cfg.name.clone())),
    }
}

pub fn build_scans(
    cfg: &ConfigFile,
    endpoints: &BTreeMap<String, EndpointRef>,
) -> Result<Vec<PlannedScan>> {
    cfg.scan
        .iter()
        .map(|scan| build_scan(cfg, scan, endpoints))
        .collect()
}

fn build_scan(
    cfg: &ConfigFile,
    scan_cfg: &ScanConfig,
    endpoints: &BTreeMap<String, EndpointRef>,
) -> Result<PlannedScan> {
    let lookup = |name: &str| {
        endpoints
            .get(name)
            .cloned()
            .ok_or_else(|| LabscanError::ConfigError(format!("unknown endpoint '{name}'")))
    };

    let dataset = MemoryDataset::shared();
    let mut builder = Scan::builder(dataset.clone())
        .reset_param(scan_cfg.reset_param)
        .silent(scan_cfg.silent);
    if let Some(name) = &scan_cfg.name {
        builder = builder.name(name.clone());
    }

    for s in &scan_cfg.sweep {
        let setter = sweep(lookup(&s.endpoint)?, s.start, s.stop, s.n_points)
            .with_delay(Duration::from_millis(s.delay_ms))
            .resetable(s.resetable);
        builder = builder.with(setter);
    }
    for name in &scan_cfg.measure {
        builder = builder.with(lookup(name)?);
    }

    Ok(PlannedScan {
        scan: builder.build()?,
        dataset,
        priority: cfg.priority_of(scan_cfg),
    })
}
