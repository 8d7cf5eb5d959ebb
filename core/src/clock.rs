//! Monotonic timers used for run and per-worker timing

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Start/stop/elapsed primitive
///
/// `elapsed` must be callable from any thread while the timer is running.
/// Repeated `start`/`stop` cycles accumulate.
pub trait Timer: Send + Sync {
    /// Start (or resume) measuring
    fn start(&mut self);

    /// Stop measuring, keeping the accumulated time
    fn stop(&mut self);

    /// Accumulated time, including the running segment if any
    fn elapsed(&self) -> Duration;
}

/// Creates a fresh timer for the run clock and for every worker
pub type TimerFactory = Arc<dyn Fn() -> Box<dyn Timer> + Send + Sync>;

/// Factory producing [`Stopwatch`] timers
pub fn stopwatch_factory() -> TimerFactory {
    Arc::new(|| Box::new(Stopwatch::new()) as Box<dyn Timer>)
}

/// Default [`Timer`] backed by [`Instant`]
#[derive(Debug, Default, Clone)]
pub struct Stopwatch {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl Stopwatch {
    /// Create a stopped stopwatch with zero elapsed time
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stopwatch that is already running
    pub fn started() -> Self {
        let mut sw = Self::new();
        sw.start();
        sw
    }

    /// Whether a segment is currently being measured
    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }
}

impl Timer for Stopwatch {
    fn start(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    fn elapsed(&self) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + since.elapsed(),
            None => self.accumulated,
        }
    }
}

impl fmt::Debug for dyn Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("elapsed", &self.elapsed())
            .finish()
    }
}
