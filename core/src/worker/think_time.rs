//! Think time between executions in user simulation mode

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{Pacing, WaitRange};

/// Samples the pause a simulated user takes between two executions
///
/// Each worker owns one, so sampling never contends with other workers.
pub struct ThinkTime {
    range: Option<WaitRange>,
    rng: StdRng,
}

impl ThinkTime {
    /// Create a sampler for the given pacing
    ///
    /// # Examples
    /// ```
    /// use stampede_core::config::{Pacing, WaitRange};
    /// use stampede_core::worker::ThinkTime;
    ///
    /// // Users pause for exactly 250ms
    /// let mut fixed = ThinkTime::new(Pacing::UserSimulation(WaitRange::fixed(250)));
    /// assert_eq!(fixed.sample(), Some(std::time::Duration::from_millis(250)));
    ///
    /// // Benchmark mode never pauses
    /// let mut none = ThinkTime::new(Pacing::Benchmark);
    /// assert_eq!(none.sample(), None);
    /// ```
    pub fn new(pacing: Pacing) -> Self {
        Self::with_rng(pacing, StdRng::from_entropy())
    }

    /// Create a sampler with a fixed seed (reproducible pauses)
    pub fn seeded(pacing: Pacing, seed: u64) -> Self {
        Self::with_rng(pacing, StdRng::seed_from_u64(seed))
    }

    fn with_rng(pacing: Pacing, rng: StdRng) -> Self {
        let range = match pacing {
            Pacing::Benchmark => None,
            Pacing::UserSimulation(range) => Some(range),
        };
        Self { range, rng }
    }

    /// Sample the next pause, `None` in benchmark mode
    ///
    /// Uniform over `[min, max]`; a degenerate range always yields `min`.
    pub fn sample(&mut self) -> Option<Duration> {
        let range = self.range?;
        if range.is_fixed() {
            return Some(range.min);
        }
        Some(self.rng.gen_range(range.min..=range.max))
    }

    /// Check if think time is enabled
    pub fn is_enabled(&self) -> bool {
        self.range.is_some()
    }
}

impl std::fmt::Debug for ThinkTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThinkTime")
            .field("enabled", &self.is_enabled())
            .field("range", &self.range)
            .finish()
    }
}
