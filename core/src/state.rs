//! State shared by all workers of one run

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::clock::Timer;

/// Shared run state: the completed-execution counter and the run clock
///
/// The clock is started in [`RunState::start`], before the state is shared,
/// and is only reachable through `&self` afterwards.
#[derive(Debug)]
pub struct RunState {
    completed_executions: AtomicU64,
    clock: Box<dyn Timer>,
}

impl RunState {
    /// Start the run clock and create the state
    pub fn start(mut clock: Box<dyn Timer>) -> Self {
        clock.start();
        Self {
            completed_executions: AtomicU64::new(0),
            clock,
        }
    }

    /// Executions completed so far across all workers
    pub fn completed_executions(&self) -> u64 {
        self.completed_executions.load(Ordering::Acquire)
    }

    /// Record one completed execution, returning the new total
    pub fn increment_completed_executions(&self) -> u64 {
        self.completed_executions.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Time since the run began
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }
}
