mod common;
use crate::common::{TestResult, init_tracing};

use labscan::endpoint::EndpointRef;
use labscan::scan::{
    EndpointOp, Flow, Function, Interrupted, MemoryDataset, RunOutcome, Scan, ScanError, Setter,
    SinkState,
};
use labscan::types::Value;
use labscan_test_utils::endpoints::{FailingEndpoint, RecordingEndpoint};

#[test]
fn resetable_setter_is_restored_after_a_complete_run() -> TestResult {
    init_tracing();

    let gate = RecordingEndpoint::new("gate", 5.0);
    let detector = RecordingEndpoint::new("detector", 0.0);
    let gate_ref: EndpointRef = gate.clone();
    let detector_ref: EndpointRef = detector.clone();

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .reset_param(true)
        .with(Setter::new(gate_ref, [6.0, 7.0, 8.0]))
        .with(detector_ref)
        .build()?;

    let report = scan.run()?;
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(gate.value(), Value::Float(5.0));
    assert_eq!(
        gate.writes(),
        vec![
            Value::Float(6.0),
            Value::Float(7.0),
            Value::Float(8.0),
            Value::Float(5.0)
        ]
    );
    Ok(())
}

#[test]
fn resetable_setter_is_restored_after_a_loop_break() -> TestResult {
    let gate = RecordingEndpoint::new("gate", 5.0);
    let gate_ref: EndpointRef = gate.clone();

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .reset_param(true)
        .with(Setter::new(gate_ref, [6.0, 7.0, 8.0]))
        .with(Function::new("stop", |ctx| {
            if ctx.last_value("gate") == Some(&Value::Float(7.0)) {
                Ok(Flow::break_loop())
            } else {
                Ok(Flow::Continue)
            }
        }).add_last_values())
        .build()?;

    scan.run()?;
    assert_eq!(gate.value(), Value::Float(5.0));
    assert_eq!(gate.writes().len(), 3, "6.0, 7.0, then the restore");
    Ok(())
}

#[test]
fn restore_happens_after_a_failing_run() -> TestResult {
    let gate = RecordingEndpoint::new("gate", 1.0);
    let gate_ref: EndpointRef = gate.clone();
    let broken = FailingEndpoint::new("broken", 0.0).fail_reads_after(1).into_ref();

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .reset_param(true)
        .with(Setter::new(gate_ref, [2.0, 3.0]))
        .with(broken)
        .build()?;

    let err = scan.run().unwrap_err();
    match err {
        ScanError::Endpoint {
            endpoint,
            operation,
            ..
        } => {
            assert_eq!(endpoint, "broken");
            assert_eq!(operation, EndpointOp::Getting);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(gate.value(), Value::Float(1.0));
    assert_eq!(scan.dataset().state(), SinkState::Closed);
    assert_eq!(scan.dataset().records().len(), 1);
    Ok(())
}

#[test]
fn every_endpoint_is_restored_even_if_one_restore_fails() -> TestResult {
    // Two successful writes during the run, the restore write fails.
    let flaky = FailingEndpoint::new("flaky", 0.0).fail_writes_after(2).into_ref();
    let gate = RecordingEndpoint::new("gate", 3.0);
    let gate_ref: EndpointRef = gate.clone();
    let detector = RecordingEndpoint::new("detector", 0.0);
    let detector_ref: EndpointRef = detector.clone();

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .reset_param(true)
        .with(Setter::new(flaky, [1.0, 2.0]))
        .with(Setter::new(gate_ref, [4.0]))
        .with(detector_ref)
        .build()?;

    let err = scan.run().unwrap_err();
    let ScanError::Restore(failures) = err else {
        panic!("expected a restore error, got {err}");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].endpoint, "flaky");
    assert_eq!(failures[0].value, Value::Float(0.0));

    // `gate` comes after the failing endpoint and is still restored.
    assert_eq!(gate.value(), Value::Float(3.0));
    assert_eq!(detector.reads(), 2);
    Ok(())
}

#[test]
fn non_resetable_setters_and_runs_without_reset_keep_their_last_value() -> TestResult {
    let kept = RecordingEndpoint::new("kept", 0.0);
    let kept_ref: EndpointRef = kept.clone();
    let other = RecordingEndpoint::new("other", 0.0);
    let other_ref: EndpointRef = other.clone();

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .reset_param(true)
        .with(Setter::new(kept_ref, [1.0, 2.0]).resetable(false))
        .with(Setter::new(other_ref.clone(), [7.0]))
        .build()?;
    scan.run()?;
    assert_eq!(kept.value(), Value::Float(2.0));
    assert_eq!(other.value(), Value::Float(0.0));

    let mut no_reset = Scan::builder(MemoryDataset::new())
        .silent(true)
        .with(Setter::new(other_ref, [9.0]))
        .build()?;
    no_reset.run()?;
    assert_eq!(other.value(), Value::Float(9.0));
    Ok(())
}

#[test]
fn function_errors_and_interrupts_propagate() -> TestResult {
    let detector = RecordingEndpoint::new("detector", 0.0);
    let detector_ref: EndpointRef = detector.clone();

    let mut failing = Scan::builder(MemoryDataset::new())
        .silent(true)
        .with(detector_ref.clone())
        .with(Function::new("explode", |_ctx| anyhow::bail!("boom")))
        .build()?;
    match failing.run() {
        Err(ScanError::Function { name, source }) => {
            assert_eq!(name, "do explode");
            assert_eq!(source.to_string(), "boom");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let mut interrupted = Scan::builder(MemoryDataset::new())
        .silent(true)
        .with(detector_ref)
        .with(Function::new("operator", |_ctx| Err(Interrupted.into())))
        .build()?;
    assert!(matches!(interrupted.run(), Err(ScanError::Interrupted)));
    assert_eq!(interrupted.dataset().state(), SinkState::Closed);
    Ok(())
}

#[test]
fn endpoint_swept_by_two_setters_is_restored_once() -> TestResult {
    let gate = RecordingEndpoint::new("gate", 5.0);
    let gate_ref: EndpointRef = gate.clone();

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .reset_param(true)
        .with(Setter::new(gate_ref.clone(), [1.0, 2.0]))
        .with(Setter::new(gate_ref, [3.0]))
        .build()?;
    scan.run()?;

    assert_eq!(gate.value(), Value::Float(5.0));
    assert_eq!(
        gate.writes(),
        vec![
            Value::Float(1.0),
            Value::Float(3.0),
            Value::Float(2.0),
            Value::Float(3.0),
            Value::Float(5.0)
        ]
    );
    // One start value, then a read-back per write during the run.
    assert_eq!(gate.reads(), 5);
    Ok(())
}
