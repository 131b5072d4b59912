// src/scan/sweeps.rs

//! Shorthands for the common linear sweeps.

use crate::endpoint::EndpointRef;
use crate::scan::action::Setter;
use crate::scan::builder::{Scan, ScanBuilder};
use crate::scan::sink::ResultSink;

/// Setter over `n_points` evenly spaced values from `start` to `stop`, both
/// included. A single point yields `[start]`; zero points an empty setter.
pub fn sweep(endpoint: EndpointRef, start: f64, stop: f64, n_points: usize) -> Setter {
    Setter::new(endpoint, linspace(start, stop, n_points))
}

pub fn linspace(start: f64, stop: f64, n_points: usize) -> Vec<f64> {
    match n_points {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Measure every endpoint once.
pub fn do0d<S: ResultSink>(sink: S, measure: &[EndpointRef]) -> ScanBuilder<S> {
    measure
        .iter()
        .cloned()
        .fold(Scan::builder(sink), |b, m| b.with(m))
}

/// One swept axis, then every measured endpoint at each point.
pub fn do1d<S: ResultSink>(sink: S, x: Setter, measure: &[EndpointRef]) -> ScanBuilder<S> {
    measure
        .iter()
        .cloned()
        .fold(Scan::builder(sink).with(x), |b, m| b.with(m))
}

/// `outer` varies slowest, `inner` fastest.
pub fn do2d<S: ResultSink>(
    sink: S,
    outer: Setter,
    inner: Setter,
    measure: &[EndpointRef],
) -> ScanBuilder<S> {
    measure
        .iter()
        .cloned()
        .fold(Scan::builder(sink).with(outer).with(inner), |b, m| b.with(m))
}
