mod common;
use crate::common::{TestResult, init_tracing, memory};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use labscan::endpoint::{CounterParameter, EndpointRef};
use labscan::scan::{Flow, Function, MemoryDataset, RunOutcome, Scan, Setter};
use labscan::types::Value;

fn counter(name: &str) -> (Arc<CounterParameter>, EndpointRef) {
    let c = Arc::new(CounterParameter::new(name));
    let e: EndpointRef = c.clone();
    (c, e)
}

/// Breaks whenever `inner` has reached `at`.
fn break_when(inner: &'static str, at: f64, flow: Flow) -> Function {
    Function::new("break check", move |ctx| {
        match ctx.last_value(inner) {
            Some(Value::Float(v)) if *v == at => Ok(flow),
            _ => Ok(Flow::Continue),
        }
    })
    .add_last_values()
}

#[test]
fn default_break_stops_only_the_innermost_loop() -> TestResult {
    init_tracing();

    let (_, outer) = memory("outer", 0.0);
    let (_, inner) = memory("inner", 0.0);
    let (getter_calls, m) = counter("m");

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .with(Setter::new(outer, [0.0, 1.0]))
        .with(Setter::new(inner, [0.0, 1.0, 2.0]))
        .with(break_when("inner", 1.0, Flow::break_loop()))
        .with(m)
        .build()?;

    let report = scan.run()?;

    // One getter call per outer value, before the break fires at inner index 1.
    assert_eq!(getter_calls.count(), 2);
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.completed_points, 2);

    let outer_values: Vec<Value> = scan
        .dataset()
        .records()
        .iter()
        .map(|r| r.setpoints[0].value.clone().unwrap())
        .collect();
    assert_eq!(outer_values, vec![Value::Float(0.0), Value::Float(1.0)]);
    Ok(())
}

#[test]
fn two_level_break_skips_the_rest_of_the_middle_loop() -> TestResult {
    let (_, a) = memory("a", 0.0);
    let (_, b) = memory("b", 0.0);
    let (_, c) = memory("c", 0.0);
    let (getter_calls, m) = counter("m");

    // Sizes 2 x 3 x 4; break two levels when c reaches index 1.
    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .with(Setter::new(a, [0.0, 1.0]))
        .with(Setter::new(b, [0.0, 1.0, 2.0]))
        .with(Setter::new(c, [0.0, 1.0, 2.0, 3.0]))
        .with(break_when("c", 1.0, Flow::break_loops(2)))
        .with(m)
        .build()?;

    scan.run()?;

    // For each value of `a`, only (b=0, c=0) is measured.
    assert_eq!(getter_calls.count(), 2);
    Ok(())
}

#[test]
fn break_deeper_than_nesting_ends_the_run() -> TestResult {
    let (_, x) = memory("x", 0.0);
    let (getter_calls, m) = counter("m");

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .with(Setter::new(x, [0.0, 1.0, 2.0]))
        .with(break_when("x", 1.0, Flow::break_loops(5)))
        .with(m)
        .build()?;

    let report = scan.run()?;
    assert_eq!(report.outcome, RunOutcome::Broken);
    assert_eq!(getter_calls.count(), 1);
    Ok(())
}

#[test]
fn abort_stops_every_loop() -> TestResult {
    let (_, outer) = memory("outer", 0.0);
    let (_, inner) = memory("inner", 0.0);
    let (getter_calls, m) = counter("m");
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .with(Setter::new(outer, [0.0, 1.0, 2.0]))
        .with(Setter::new(inner, [0.0, 1.0, 2.0]))
        .with(m)
        .with(Function::new("stop after four", move |_ctx| {
            if seen.fetch_add(1, Ordering::SeqCst) == 3 {
                Ok(Flow::Abort)
            } else {
                Ok(Flow::Continue)
            }
        }))
        .build()?;

    let report = scan.run()?;
    assert_eq!(report.outcome, RunOutcome::Aborted);
    assert_eq!(getter_calls.count(), 4);
    assert_eq!(report.completed_points, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    Ok(())
}

#[test]
fn break_clears_setpoints_of_abandoned_axes() -> TestResult {
    let (_, a) = memory("a", 0.0);
    let (_, b) = memory("b", 0.0);
    let (_, c) = memory("c", 0.0);

    let seen_c: Arc<std::sync::Mutex<Vec<bool>>> = Arc::default();
    let log = seen_c.clone();

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .with(Setter::new(a, [0.0, 1.0]))
        .with(Setter::new(b, [0.0, 1.0]))
        .with(
            Function::new("observe", move |ctx| {
                log.lock().unwrap().push(ctx.last_value("c").is_some());
                Ok(Flow::Continue)
            })
            .add_last_values(),
        )
        .with(Setter::new(c, [0.0, 1.0]))
        .with(break_when("c", 1.0, Flow::break_loops(2)))
        .build()?;

    let report = scan.run()?;
    assert_eq!(report.outcome, RunOutcome::Completed);

    // The break passes through "observe" on its way to `b`, which unsets `c`
    // before the next value of `a` is visited.
    assert_eq!(*seen_c.lock().unwrap(), vec![false, false]);
    Ok(())
}

#[test]
fn break_all_unwinds_every_loop() -> TestResult {
    let (_, outer) = memory("outer", 0.0);
    let (_, inner) = memory("inner", 0.0);
    let (getter_calls, m) = counter("m");

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .with(Setter::new(outer, [0.0, 1.0, 2.0]))
        .with(Setter::new(inner, [0.0, 1.0, 2.0, 3.0]))
        .with(break_when("inner", 2.0, Flow::break_all()))
        .with(m)
        .build()?;

    let report = scan.run()?;
    assert_eq!(report.outcome, RunOutcome::Broken);
    assert_eq!(getter_calls.count(), 2);
    assert_eq!(report.completed_points, 2);
    assert_eq!(report.total_points, 12);
    Ok(())
}
