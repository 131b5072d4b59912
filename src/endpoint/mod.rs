// src/endpoint/mod.rs

//! Endpoint contract consumed by the sweep engine.
//!
//! An endpoint is anything that can be written and read back: an instrument
//! parameter, a virtual gate, a detector channel. The engine never owns the
//! underlying device; it only calls [`Endpoint::read`] / [`Endpoint::write`]
//! on the thread that runs the scan.
//!
//! - [`simulated`] provides in-memory endpoints used by the demo binary and
//!   by tests.

pub mod simulated;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::types::Value;

pub use simulated::{CounterParameter, ElapsedTime, MemoryParameter};

/// Synchronous settable/gettable quantity.
///
/// Implementations must tolerate repeated reads: the runner reads a value back
/// immediately after writing it to record what the device actually realized.
pub trait Endpoint: Send + Sync {
    /// Name used for diagnostics and as the result-sink schema key.
    fn name(&self) -> &str;

    /// Read the current value.
    fn read(&self) -> Result<Value>;

    /// Apply a new value.
    fn write(&self, value: &Value) -> Result<()>;
}

/// Shared handle to an endpoint. Identity is the allocation, not the name.
pub type EndpointRef = Arc<dyn Endpoint>;

/// Whether two handles point at the same endpoint instance.
pub fn same_endpoint(a: &EndpointRef, b: &EndpointRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl fmt::Debug for dyn Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
