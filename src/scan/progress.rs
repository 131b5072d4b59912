// src/scan/progress.rs

//! Progress reporting for running scans.
//!
//! The runner calls [`ProgressReporter::advance`] once per completed
//! innermost iteration and [`ProgressReporter::close`] when the run ends,
//! whatever the outcome. [`LogProgress`] reports through `tracing`.

use std::time::Instant;

use tracing::info;

pub trait ProgressReporter: Send {
    fn advance(&mut self, n: u64);
    fn close(&mut self);
}

/// Snapshot of scan progress.
#[derive(Debug, Clone)]
pub struct ProgressStats {
    pub points_done: u64,
    pub total_points: u64,
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_points == 0 {
            return 1.0;
        }
        (self.points_done as f64 / self.total_points as f64).min(1.0)
    }

    /// Estimated seconds remaining (None until the first point is done).
    pub fn eta_secs(&self) -> Option<f64> {
        if self.points_done == 0 {
            return None;
        }
        let remaining = self.total_points.saturating_sub(self.points_done);
        Some(self.elapsed_secs / self.points_done as f64 * remaining as f64)
    }
}

/// Logs every tenth of the scan at `info` level.
#[derive(Debug)]
pub struct LogProgress {
    scan: String,
    total: u64,
    done: u64,
    last_decile: u64,
    started: Instant,
    closed: bool,
}

impl LogProgress {
    pub fn new(scan: impl Into<String>, total: u64) -> Self {
        Self {
            scan: scan.into(),
            total,
            done: 0,
            last_decile: 0,
            started: Instant::now(),
            closed: false,
        }
    }

    pub fn stats(&self) -> ProgressStats {
        ProgressStats {
            points_done: self.done,
            total_points: self.total,
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        }
    }
}

impl ProgressReporter for LogProgress {
    fn advance(&mut self, n: u64) {
        self.done += n;
        let decile = (self.stats().fraction() * 10.0) as u64;
        if decile > self.last_decile {
            self.last_decile = decile;
            let stats = self.stats();
            info!(
                scan = %self.scan,
                done = stats.points_done,
                total = stats.total_points,
                eta_secs = stats.eta_secs().unwrap_or(0.0),
                "scan progress {}%",
                decile * 10
            );
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let stats = self.stats();
        info!(
            scan = %self.scan,
            done = stats.points_done,
            total = stats.total_points,
            elapsed_secs = stats.elapsed_secs,
            "scan progress closed"
        );
    }
}
