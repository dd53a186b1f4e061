use std::sync::atomic::{AtomicBool, Ordering};

use crate::logger::RunId;
use crate::metrics::RunStatistics;

/// State scoped to one run, shared by every execution unit.
#[derive(Debug, Default)]
pub struct RunContext {
    run_id: RunId,
    cancelled: AtomicBool,
    stats: RunStatistics,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Set the cancellation flag. Units observe it before their next task;
    /// nothing is interrupted.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Clear the cancellation flag so a new batch of units can run.
    pub fn resume(&self) {
        self.cancelled.store(false, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> &RunStatistics {
        &self.stats
    }
}
