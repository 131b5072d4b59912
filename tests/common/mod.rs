#![allow(dead_code)]

use std::sync::Arc;

use labscan::endpoint::{EndpointRef, MemoryParameter};

pub use labscan_test_utils::{init_tracing, wait_until_started, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A memory endpoint plus its type-erased handle.
pub fn memory(name: &str, initial: f64) -> (Arc<MemoryParameter>, EndpointRef) {
    let param = Arc::new(MemoryParameter::new(name, initial));
    let endpoint: EndpointRef = param.clone();
    (param, endpoint)
}
