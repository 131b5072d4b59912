use std::sync::{Arc, Mutex};

use labscan::scan::ProgressReporter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounts {
    pub advanced: u64,
    pub closed: u32,
}

/// Progress reporter that only counts; clones share the counts.
#[derive(Debug, Clone, Default)]
pub struct CountingProgress {
    counts: Arc<Mutex<ProgressCounts>>,
}

impl CountingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> ProgressCounts {
        *self.counts.lock().unwrap()
    }
}

impl ProgressReporter for CountingProgress {
    fn advance(&mut self, n: u64) {
        self.counts.lock().unwrap().advanced += n;
    }

    fn close(&mut self) {
        self.counts.lock().unwrap().closed += 1;
    }
}
