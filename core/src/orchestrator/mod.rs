//! Orchestrator for run lifecycle management
//!
//! The Orchestrator coordinates one complete run:
//! - Creating the shared [`RunState`](crate::state::RunState)
//! - Starting one worker thread per concurrency unit
//! - Cancelling workers on shutdown, timeout or Ctrl+C
//! - Joining every worker and aggregating their results
//!
//! # Example
//!
//! ```ignore
//! use stampede_core::{test_fn, OrchestratorBuilder};
//!
//! let orchestrator = OrchestratorBuilder::new()
//!     .concurrency(10)
//!     .time_to_run(Duration::from_secs(30))
//!     .test(test_fn(|| client.ping()))
//!     .build()?;
//!
//! let result = orchestrator.run_with_signal_handling().await?;
//! println!("{} executions", result.total_completed_executions());
//! ```

mod aggregator;
mod builder;
mod executor;
mod result;

pub use aggregator::{aggregate_worker_results, AggregatedStats, TimePeriod};
pub use builder::OrchestratorBuilder;
pub use executor::Orchestrator;
pub use result::RunResult;
