// src/config/mod.rs

//! Configuration loading and validation for labscan.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Cross-check scans against declared endpoints (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, EndpointConfig, EndpointKind, RawConfigFile, ScanConfig, SchedulerSection,
    SweepConfig,
};
