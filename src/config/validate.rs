// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{LabscanError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = LabscanError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.scheduler, raw.endpoint, raw.scan))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_scans(cfg)?;
    validate_endpoints(cfg)?;
    validate_scans(cfg)?;
    Ok(())
}

fn config_error(msg: String) -> LabscanError {
    LabscanError::ConfigError(msg)
}

fn ensure_has_scans(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scan.is_empty() {
        return Err(config_error(
            "config must contain at least one [[scan]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_endpoints(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for ep in &cfg.endpoint {
        if ep.name.trim().is_empty() {
            return Err(config_error("endpoint name must not be empty".to_string()));
        }
        if !seen.insert(ep.name.as_str()) {
            return Err(config_error(format!(
                "endpoint '{}' is declared more than once",
                ep.name
            )));
        }
        if let Some(resolution) = ep.resolution {
            if resolution.is_nan() || resolution <= 0.0 {
                return Err(config_error(format!(
                    "endpoint '{}': resolution must be > 0 (got {resolution})",
                    ep.name
                )));
            }
        }
    }
    Ok(())
}

fn validate_scans(cfg: &RawConfigFile) -> Result<()> {
    for (i, scan) in cfg.scan.iter().enumerate() {
        let label = scan
            .name
            .clone()
            .unwrap_or_else(|| format!("#{}", i + 1));

        if scan.sweep.is_empty() && scan.measure.is_empty() {
            return Err(config_error(format!(
                "scan '{label}' has neither sweeps nor measurements"
            )));
        }

        for sweep in &scan.sweep {
            let Some(ep) = cfg.endpoint.iter().find(|e| e.name == sweep.endpoint) else {
                return Err(config_error(format!(
                    "scan '{label}' sweeps unknown endpoint '{}'",
                    sweep.endpoint
                )));
            };
            if !ep.kind.is_sweepable() {
                return Err(config_error(format!(
                    "scan '{label}' cannot sweep {:?} endpoint '{}'",
                    ep.kind, sweep.endpoint
                )));
            }
            if sweep.n_points == 0 {
                return Err(config_error(format!(
                    "scan '{label}': sweep of '{}' must have n_points >= 1",
                    sweep.endpoint
                )));
            }
        }

        for name in &scan.measure {
            if !cfg.endpoint.iter().any(|e| &e.name == name) {
                return Err(config_error(format!(
                    "scan '{label}' measures unknown endpoint '{name}'"
                )));
            }
        }
    }
    Ok(())
}
