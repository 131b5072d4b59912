// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::scan::ScanError;

#[derive(Error, Debug)]
pub enum LabscanError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LabscanError>;
