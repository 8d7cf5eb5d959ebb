//! stampede-core: concurrent benchmark and load-execution engine
//!
//! Runs a user-supplied unit of work repeatedly across a configurable number
//! of worker threads and reports a race-free aggregate of what happened.
//!
//! - [`Settings`] describes a run and is validated into a [`RunPlan`]
//! - [`Worker`]s execute the test until a primary or secondary limit is hit
//! - [`Orchestrator`] starts the workers, joins them and aggregates
//!   their [`WorkerResult`]s into a [`RunResult`]
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use stampede_core::{test_fn, OrchestratorBuilder};
//!
//! # async fn demo() -> stampede_core::BenchResult<()> {
//! let orchestrator = OrchestratorBuilder::new()
//!     .name("noop")
//!     .concurrency(4)
//!     .time_to_run(Duration::from_secs(5))
//!     .test(test_fn(|| Ok(())))
//!     .build()?;
//!
//! let result = orchestrator.run().await?;
//! assert!(!result.has_errors());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod state;
pub mod traits;
pub mod worker;

pub use clock::{stopwatch_factory, Stopwatch, Timer, TimerFactory};
pub use config::{
    BenchmarkMode, ConfigError, ExceptionMode, ExceptionPolicy, Pacing, PrimaryLimit, RunPlan,
    SecondaryLimit, Settings, WaitRange,
};
pub use error::*;
pub use orchestrator::{
    aggregate_worker_results, AggregatedStats, Orchestrator, OrchestratorBuilder, RunResult,
    TimePeriod,
};
pub use state::RunState;
pub use traits::*;
pub use worker::{StopReason, ThinkTime, Worker, WorkerBuilder, WorkerResult};
