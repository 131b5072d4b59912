mod common;
use crate::common::{TestResult, init_tracing, wait_until_started, with_timeout};

use labscan::engine::{DEFAULT_PRIORITY, JobState, Scheduler};
use labscan_test_utils::jobs::{Gate, Outcome, RecordingJob, execution_log};

#[tokio::test]
async fn jobs_run_by_priority_then_submission_order() -> TestResult {
    init_tracing();

    let scheduler = Scheduler::start();
    let log = execution_log();
    let gate = Gate::new();

    // Keep the worker busy so everything below queues up.
    let blocker = scheduler.submit(
        RecordingJob::new("blocker", &log).blocked_on(&gate),
        DEFAULT_PRIORITY,
    );
    with_timeout(wait_until_started(&blocker)).await;

    scheduler.submit(RecordingJob::new("p5", &log), 5);
    scheduler.submit(RecordingJob::new("p1-first", &log), 1);
    scheduler.submit(RecordingJob::new("p3", &log), 3);
    scheduler.submit(RecordingJob::new("p1-second", &log), 1);
    assert_eq!(scheduler.pending_count(), 4);

    gate.open();
    with_timeout(scheduler.drain()).await;

    let order = log.lock().unwrap().clone();
    assert_eq!(order, vec!["blocker", "p1-first", "p1-second", "p3", "p5"]);
    assert_eq!(scheduler.pending_count(), 0);

    scheduler.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn cancel_before_start_skips_the_job() -> TestResult {
    let scheduler = Scheduler::start();
    let log = execution_log();
    let gate = Gate::new();

    let blocker = scheduler.submit(RecordingJob::new("blocker", &log).blocked_on(&gate), 1);
    with_timeout(wait_until_started(&blocker)).await;

    let victim = scheduler.submit(RecordingJob::new("victim", &log), 1);
    assert!(scheduler.cancel(&victim));

    gate.open();
    // A skipped job never reports Running; `started` returns its final state.
    assert_eq!(with_timeout(victim.started()).await, JobState::Skipped);
    let state = with_timeout(victim.wait()).await;
    assert_eq!(state, JobState::Skipped);
    assert_eq!(*log.lock().unwrap(), vec!["blocker"]);

    // Already processed: nothing left to cancel.
    assert!(!scheduler.cancel(&victim));
    Ok(())
}

#[tokio::test]
async fn cancel_after_start_does_not_interrupt_the_run() -> TestResult {
    let scheduler = Scheduler::start();
    let log = execution_log();
    let gate = Gate::new();

    let job = RecordingJob::new("running", &log).blocked_on(&gate);
    let observed = job.cancel_observed();
    let handle = scheduler.submit(job, 1);
    assert_eq!(with_timeout(wait_until_started(&handle)).await, JobState::Running);

    scheduler.cancel(&handle);
    gate.open();

    assert_eq!(with_timeout(handle.wait()).await, JobState::Completed);
    assert_eq!(*log.lock().unwrap(), vec!["running"]);
    // The job saw the token flip but nothing forced it to stop.
    assert_eq!(*observed.lock().unwrap(), Some(true));
    Ok(())
}

#[tokio::test]
async fn cancel_all_counts_unfinished_jobs_and_empties_the_registry() -> TestResult {
    let scheduler = Scheduler::start();
    let log = execution_log();
    let gate = Gate::new();

    let done = scheduler.submit(RecordingJob::new("done", &log), 1);
    assert_eq!(with_timeout(done.wait()).await, JobState::Completed);

    let blocker = scheduler.submit(RecordingJob::new("blocker", &log).blocked_on(&gate), 1);
    with_timeout(wait_until_started(&blocker)).await;
    let queued: Vec<_> = (0..3)
        .map(|i| scheduler.submit(RecordingJob::new(&format!("q{i}"), &log), 2))
        .collect();

    // The running blocker plus three queued jobs; `done` is not counted.
    assert_eq!(scheduler.cancel_all(), 4);
    assert_eq!(scheduler.cancel_all(), 0);

    gate.open();
    with_timeout(scheduler.drain()).await;

    assert_eq!(blocker.state(), JobState::Completed);
    for handle in &queued {
        assert_eq!(handle.state(), JobState::Skipped);
    }
    assert_eq!(done.state(), JobState::Completed);
    assert_eq!(*log.lock().unwrap(), vec!["done", "blocker"]);
    Ok(())
}

#[tokio::test]
async fn failing_and_panicking_jobs_do_not_stop_the_worker() -> TestResult {
    let scheduler = Scheduler::start();
    let log = execution_log();

    let failing = scheduler.submit(RecordingJob::new("fails", &log).outcome(Outcome::Fail), 1);
    let panicking = scheduler.submit(RecordingJob::new("panics", &log).outcome(Outcome::Panic), 1);
    let fine = scheduler.submit(RecordingJob::new("fine", &log), 1);

    with_timeout(scheduler.drain()).await;

    assert_eq!(failing.state(), JobState::Failed);
    assert_eq!(panicking.state(), JobState::Failed);
    assert_eq!(fine.state(), JobState::Completed);
    assert_eq!(*log.lock().unwrap(), vec!["fails", "panics", "fine"]);
    Ok(())
}

#[tokio::test]
async fn shutdown_leaves_queued_jobs_unrun() -> TestResult {
    let scheduler = Scheduler::start();
    let log = execution_log();
    let gate = Gate::new();

    let blocker = scheduler.submit(RecordingJob::new("blocker", &log).blocked_on(&gate), 1);
    with_timeout(wait_until_started(&blocker)).await;
    let never = scheduler.submit(RecordingJob::new("never", &log), 1);

    gate.open();
    with_timeout(scheduler.shutdown()).await;

    assert_eq!(blocker.state(), JobState::Completed);
    assert_eq!(with_timeout(never.wait()).await, JobState::Queued);
    assert_eq!(*log.lock().unwrap(), vec!["blocker"]);
    Ok(())
}
