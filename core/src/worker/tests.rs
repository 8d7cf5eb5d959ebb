//! Integration tests for the Worker module

use super::*;
use crate::clock::Stopwatch;
use crate::config::{ExceptionMode, RunPlan, Settings, WaitRange};
use crate::error::BenchError;
use crate::state::RunState;
use crate::traits::{error_classifier, execution_condition, test_fn, TestFn};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Test errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
#[error("expected failure #{0}")]
struct ExpectedFailure(usize);

#[derive(Debug, thiserror::Error)]
#[error("unexpected failure #{0}")]
struct UnexpectedFailure(usize);

// ============================================================================
// Helper functions
// ============================================================================

fn new_state() -> Arc<RunState> {
    Arc::new(RunState::start(Box::new(Stopwatch::new())))
}

fn create_test_worker(
    id: usize,
    settings: &Settings,
    test: TestFn,
    state: Arc<RunState>,
) -> Worker {
    let plan: Arc<RunPlan> = Arc::new(settings.plan().expect("invalid settings"));
    WorkerBuilder::new(id)
        .test(test)
        .plan(plan)
        .state(state)
        .seed(id as u64)
        .build()
        .expect("Failed to build worker")
}

/// Run `settings.concurrency` workers on their own threads and join them
fn run_workers(settings: &Settings, test: TestFn) -> (Vec<WorkerResult>, Arc<RunState>) {
    let state = new_state();
    let handles: Vec<_> = (0..settings.concurrency)
        .map(|id| {
            let worker = create_test_worker(id, settings, Arc::clone(&test), Arc::clone(&state));
            std::thread::spawn(move || worker.run())
        })
        .collect();

    let results = handles
        .into_iter()
        .map(|h| {
            h.join()
                .expect("Worker thread panicked")
                .expect("Worker failed")
        })
        .collect();
    (results, state)
}

fn counting_test(counter: Arc<AtomicUsize>) -> TestFn {
    test_fn(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

// ============================================================================
// Stop conditions
// ============================================================================

#[test]
fn test_worker_run_execution_count() {
    let calls = Arc::new(AtomicUsize::new(0));
    let settings = Settings::new(1).with_number_of_executions(25);

    let state = new_state();
    let worker = create_test_worker(0, &settings, counting_test(calls.clone()), state.clone());
    let result = worker.run().expect("Worker failed");

    assert_eq!(result.completed_executions, 25);
    assert_eq!(result.stop_reason, StopReason::CountLimit);
    assert_eq!(result.exception_count, 0);
    assert!(!result.has_errors());
    assert_eq!(calls.load(Ordering::SeqCst), 25);
    assert_eq!(state.completed_executions(), 25);
}

#[test]
fn test_concurrent_workers_share_count_limit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let settings = Settings::new(4).with_number_of_executions(1000);

    let (results, state) = run_workers(&settings, counting_test(calls.clone()));

    let total: u64 = results.iter().map(|r| r.completed_executions).sum();
    assert_eq!(total, state.completed_executions());
    assert_eq!(total as usize, calls.load(Ordering::SeqCst));

    // Workers may finish an in-flight execution after the limit is hit,
    // but never stop short of it
    assert!(total >= 1000);
    assert!(total < 1000 + settings.concurrency as u64);
    assert!(results
        .iter()
        .all(|r| r.stop_reason == StopReason::CountLimit));
}

#[test]
fn test_worker_run_duration() {
    let settings = Settings::new(1).with_time_to_run(Duration::from_millis(100));
    let test = test_fn(|| {
        std::thread::sleep(Duration::from_millis(5));
        Ok(())
    });

    let start = Instant::now();
    let state = new_state();
    let worker = create_test_worker(0, &settings, test, state.clone());
    let result = worker.run().expect("Worker failed");
    let elapsed = start.elapsed();

    assert_eq!(result.stop_reason, StopReason::TimeLimit);
    assert!(elapsed >= Duration::from_millis(100));
    assert!(result.completed_executions > 0);
    assert!(state.elapsed() >= Duration::from_millis(100));
}

#[test]
fn test_execution_condition_false_stops_before_running() {
    let calls = Arc::new(AtomicUsize::new(0));
    let settings = Settings::new(1).with_number_of_executions(10);
    let plan = Arc::new(settings.plan().unwrap());

    let worker = WorkerBuilder::new(0)
        .test(counting_test(calls.clone()))
        .execution_condition(Some(execution_condition(|| false)))
        .plan(plan)
        .state(new_state())
        .build()
        .unwrap();
    let result = worker.run().unwrap();

    assert_eq!(result.stop_reason, StopReason::ExecutionConditionFalse);
    assert_eq!(result.completed_executions, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_execution_condition_checked_every_iteration() {
    let calls = Arc::new(AtomicUsize::new(0));
    let settings = Settings::new(1).with_number_of_executions(100);
    let plan = Arc::new(settings.plan().unwrap());

    let seen = calls.clone();
    let worker = WorkerBuilder::new(0)
        .test(counting_test(calls.clone()))
        .execution_condition(Some(execution_condition(move || {
            seen.load(Ordering::SeqCst) < 7
        })))
        .plan(plan)
        .state(new_state())
        .build()
        .unwrap();
    let result = worker.run().unwrap();

    assert_eq!(result.stop_reason, StopReason::ExecutionConditionFalse);
    assert_eq!(result.completed_executions, 7);
}

#[test]
fn test_secondary_count_limit() {
    let settings = Settings::new(1)
        .with_time_to_run(Duration::from_secs(30))
        .with_max_number_of_executions(12);

    let (results, state) = run_workers(&settings, test_fn(|| Ok(())));

    assert_eq!(results[0].stop_reason, StopReason::SecondaryCountLimit);
    assert_eq!(results[0].completed_executions, 12);
    assert_eq!(state.completed_executions(), 12);
}

#[test]
fn test_secondary_time_limit() {
    let settings = Settings::new(2)
        .with_number_of_executions(u64::MAX)
        .with_max_time_to_run(Duration::from_millis(80));
    let test = test_fn(|| {
        std::thread::sleep(Duration::from_millis(2));
        Ok(())
    });

    let start = Instant::now();
    let (results, _) = run_workers(&settings, test);
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(80));
    assert!(elapsed < Duration::from_millis(500));
    for result in &results {
        assert_eq!(result.stop_reason, StopReason::SecondaryTimeLimit);
        assert!(result.completed_executions > 0);
    }
}

#[test]
fn test_secondary_limits_checked_before_primary_is_reached() {
    // A ceiling lower than the primary count wins
    let settings = Settings::new(1)
        .with_number_of_executions(1_000_000)
        .with_max_time_to_run(Duration::from_millis(20));

    let (results, _) = run_workers(&settings, test_fn(|| Ok(())));
    assert_eq!(results[0].stop_reason, StopReason::SecondaryTimeLimit);
    assert!(results[0].completed_executions < 1_000_000);
}

#[test]
fn test_cancelled_worker_stops() {
    let calls = Arc::new(AtomicUsize::new(0));
    let settings = Settings::new(1).with_time_to_run(Duration::from_secs(30));
    let token = CancellationToken::new();
    token.cancel();

    let worker = WorkerBuilder::new(0)
        .test(counting_test(calls.clone()))
        .plan(Arc::new(settings.plan().unwrap()))
        .state(new_state())
        .cancel(token)
        .build()
        .unwrap();
    let result = worker.run().unwrap();

    assert_eq!(result.stop_reason, StopReason::Cancelled);
    assert_eq!(result.completed_executions, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancel_from_another_thread() {
    let settings = Settings::new(1).with_time_to_run(Duration::from_secs(30));
    let token = CancellationToken::new();

    let worker = WorkerBuilder::new(0)
        .test(test_fn(|| {
            std::thread::sleep(Duration::from_millis(1));
            Ok(())
        }))
        .plan(Arc::new(settings.plan().unwrap()))
        .state(new_state())
        .cancel(token.clone())
        .build()
        .unwrap();

    let handle = std::thread::spawn(move || worker.run());
    std::thread::sleep(Duration::from_millis(30));
    token.cancel();

    let result = handle.join().unwrap().unwrap();
    assert_eq!(result.stop_reason, StopReason::Cancelled);
    assert!(result.completed_executions > 0);
}

// ============================================================================
// Exception handling
// ============================================================================

#[test]
fn test_count_mode_classifies_errors() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted_raised = Arc::new(AtomicUsize::new(0));
    let uncounted_raised = Arc::new(AtomicUsize::new(0));

    let test = {
        let calls = calls.clone();
        let counted_raised = counted_raised.clone();
        let uncounted_raised = uncounted_raised.clone();
        test_fn(move || {
            let i = calls.fetch_add(1, Ordering::SeqCst);
            if i % 3 == 0 {
                counted_raised.fetch_add(1, Ordering::SeqCst);
                return Err(ExpectedFailure(i).into());
            }
            if i % 8 == 0 {
                uncounted_raised.fetch_add(1, Ordering::SeqCst);
                return Err(UnexpectedFailure(i).into());
            }
            Ok(())
        })
    };

    let settings = Settings::new(1)
        .with_number_of_executions(48)
        .with_exception_mode(ExceptionMode::Count)
        .with_error_classifier(error_classifier(|e| {
            e.downcast_ref::<ExpectedFailure>().is_some()
        }));

    let (results, state) = run_workers(&settings, test);
    let result = &results[0];

    // Errors never stop the worker; the limit is still reached
    assert_eq!(result.stop_reason, StopReason::CountLimit);
    assert_eq!(result.completed_executions, 48);
    assert_eq!(state.completed_executions(), 48);

    assert_eq!(
        result.exception_count as usize,
        counted_raised.load(Ordering::SeqCst)
    );
    assert_eq!(result.exception_count, 16);
    assert_eq!(uncounted_raised.load(Ordering::SeqCst), 4);

    let first_counted = result.first_counted_error.as_ref().unwrap();
    assert_eq!(first_counted.to_string(), "expected failure #0");
    let first_uncounted = result.first_uncounted_error.as_ref().unwrap();
    assert_eq!(first_uncounted.to_string(), "unexpected failure #8");
    assert!(result.has_errors());
}

#[test]
fn test_count_mode_without_classifier_counts_everything() {
    let settings = Settings::new(1).with_number_of_executions(10);
    let test = test_fn(|| Err(anyhow::anyhow!("always")));

    let (results, _) = run_workers(&settings, test);

    assert_eq!(results[0].exception_count, 10);
    assert_eq!(results[0].completed_executions, 10);
    assert!(results[0].first_uncounted_error.is_none());
    assert!(results[0].first_counted_error.is_some());
}

#[test]
fn test_stop_mode_stops_on_first_error() {
    let settings = Settings::new(3)
        .with_time_to_run(Duration::from_secs(30))
        .with_exception_mode(ExceptionMode::Stop);
    let test = test_fn(|| Err(anyhow::anyhow!("broken")));

    let start = Instant::now();
    let (results, state) = run_workers(&settings, test);

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(results.len(), 3);
    for result in &results {
        assert_eq!(result.stop_reason, StopReason::Exception);
        assert!(result.stopped_on_error());
        assert_eq!(result.completed_executions, 0);
        assert_eq!(result.exception_count, 0);
        let err = result.first_uncounted_error.as_ref().unwrap();
        assert_eq!(err.to_string(), "broken");
    }
    assert_eq!(state.completed_executions(), 0);
}

#[test]
fn test_stop_mode_keeps_earlier_completions() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let test = test_fn(move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 5 {
            anyhow::bail!("sixth call fails");
        }
        Ok(())
    });
    let settings = Settings::new(1)
        .with_number_of_executions(100)
        .with_exception_mode(ExceptionMode::Stop);

    let (results, _) = run_workers(&settings, test);
    assert_eq!(results[0].stop_reason, StopReason::Exception);
    assert_eq!(results[0].completed_executions, 5);
}

#[test]
fn test_rethrow_mode_returns_error() {
    let settings = Settings::new(1)
        .with_number_of_executions(100)
        .with_exception_mode(ExceptionMode::Rethrow);
    let test = test_fn(|| Err(ExpectedFailure(42).into()));

    let worker = create_test_worker(5, &settings, test, new_state());
    let err = worker.run().unwrap_err();

    match err {
        BenchError::Rethrown { worker_id, error } => {
            assert_eq!(worker_id, 5);
            assert!(error.downcast_ref::<ExpectedFailure>().is_some());
        }
        other => panic!("unexpected error {other:?}"),
    }
}

// ============================================================================
// User simulation
// ============================================================================

#[test]
fn test_user_simulation_pauses_between_executions() {
    let settings = Settings::new(1)
        .with_time_to_run(Duration::from_millis(250))
        .with_user_simulation(WaitRange::fixed(50));

    let start = Instant::now();
    let (results, _) = run_workers(&settings, test_fn(|| Ok(())));
    let elapsed = start.elapsed();
    let result = &results[0];

    assert_eq!(result.stop_reason, StopReason::TimeLimit);
    // At most one execution per pause, plus the first
    assert!(result.completed_executions <= 250 / 50 + 1);
    assert!(result.completed_executions >= 2);
    // Worker time only covers the test itself, not the pauses
    assert!(result.elapsed < elapsed / 2);
}

#[test]
fn test_pause_past_ceiling_stops_without_waiting() {
    let settings = Settings::new(1)
        .with_number_of_executions(1000)
        .with_max_time_to_run(Duration::from_millis(150))
        .with_user_simulation(WaitRange::fixed(100));

    let start = Instant::now();
    let (results, _) = run_workers(&settings, test_fn(|| Ok(())));
    let elapsed = start.elapsed();

    // t=0 run, pause until t=100, run, next pause would end at t>=200
    assert_eq!(results[0].stop_reason, StopReason::SecondaryTimeLimit);
    assert_eq!(results[0].completed_executions, 2);
    assert!(elapsed < Duration::from_millis(190));
}

#[test]
fn test_user_simulation_bounded_by_minimum_wait() {
    let settings = Settings::new(3)
        .with_time_to_run(Duration::from_millis(400))
        .with_user_simulation(WaitRange::from_millis(100, 200));

    let (results, state) = run_workers(&settings, test_fn(|| Ok(())));

    let total: u64 = results.iter().map(|r| r.completed_executions).sum();
    assert_eq!(total, state.completed_executions());
    for result in &results {
        assert_eq!(result.stop_reason, StopReason::TimeLimit);
        assert!(result.completed_executions <= 400 / 100 + 1);
    }
}

#[test]
fn test_unbounded_pause_stops_at_ceiling() {
    // A pause this long cannot be added to the run clock
    let settings = Settings::new(1)
        .with_number_of_executions(10)
        .with_max_time_to_run(Duration::from_secs(1))
        .with_user_simulation(WaitRange::new(Duration::MAX, Duration::MAX));
    assert!(settings.validate().is_ok());

    let start = Instant::now();
    let (results, state) = run_workers(&settings, test_fn(|| Ok(())));

    assert_eq!(results[0].stop_reason, StopReason::SecondaryTimeLimit);
    assert_eq!(results[0].completed_executions, 1);
    assert_eq!(state.completed_executions(), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}
