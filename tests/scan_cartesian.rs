mod common;
use crate::common::{TestResult, init_tracing, memory};

use std::collections::HashSet;
use std::sync::Arc;

use labscan::endpoint::{CounterParameter, EndpointRef};
use labscan::engine::CancelToken;
use labscan::scan::{MemoryDataset, RunOutcome, Scan, Setter, sweep};
use labscan::types::Value;
use labscan_test_utils::progress::CountingProgress;

fn counter(name: &str) -> (Arc<CounterParameter>, EndpointRef) {
    let c = Arc::new(CounterParameter::new(name));
    let e: EndpointRef = c.clone();
    (c, e)
}

#[test]
fn three_setters_visit_the_full_cartesian_product() -> TestResult {
    init_tracing();

    let (_, x) = memory("x", 0.0);
    let (_, y) = memory("y", 0.0);
    let (_, z) = memory("z", 0.0);
    let (count, m) = counter("m");

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .with(Setter::new(x, [1.0, 2.0]))
        .with(Setter::new(y, [10.0, 20.0, 30.0]))
        .with(Setter::new(z, [100.0, 200.0, 300.0, 400.0]))
        .with(m)
        .build()?;

    assert_eq!(scan.loop_shape(), &[2, 3, 4]);

    let report = scan.run()?;
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.completed_points, 24);
    assert_eq!(report.total_points, 24);
    assert_eq!(count.count(), 24);

    let records = scan.dataset().records();
    assert_eq!(records.len(), 24);

    let tuples: HashSet<String> = records
        .iter()
        .map(|r| format!("{:?}", r.setpoint_values()))
        .collect();
    assert_eq!(tuples.len(), 24, "every setpoint tuple must be unique");

    Ok(())
}

#[test]
fn first_setter_varies_slowest() -> TestResult {
    let (_, outer) = memory("outer", 0.0);
    let (_, inner) = memory("inner", 0.0);
    let (_, m) = counter("m");

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .with(Setter::new(outer, [1.0, 2.0]))
        .with(Setter::new(inner, [10.0, 20.0, 30.0]))
        .with(m)
        .build()?;
    scan.run()?;

    let order: Vec<Vec<Value>> = scan
        .dataset()
        .records()
        .iter()
        .map(|r| r.setpoint_values())
        .collect();

    let expected: Vec<Vec<Value>> = [1.0, 2.0]
        .iter()
        .flat_map(|&o| {
            [10.0, 20.0, 30.0]
                .iter()
                .map(move |&i| vec![Value::Float(o), Value::Float(i)])
        })
        .collect();
    assert_eq!(order, expected);
    Ok(())
}

#[test]
fn records_carry_read_back_values() -> TestResult {
    let dac = Arc::new(labscan::endpoint::MemoryParameter::new("dac", 0.0).with_resolution(0.5));
    let dac_ref: EndpointRef = dac.clone();
    let (_, m) = counter("m");

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .with(Setter::new(dac_ref, [0.2, 0.7, 1.2]))
        .with(m)
        .build()?;
    scan.run()?;

    let realized: Vec<Value> = scan
        .dataset()
        .records()
        .iter()
        .flat_map(|r| r.setpoint_values())
        .collect();
    assert_eq!(
        realized,
        vec![Value::Float(0.0), Value::Float(0.5), Value::Float(1.0)]
    );
    Ok(())
}

#[test]
fn linear_sweep_runs_through_the_progress_reporter() -> TestResult {
    let (_, x) = memory("x", 0.0);
    let (_, m) = counter("m");
    let mut progress = CountingProgress::new();

    let mut scan = Scan::builder(MemoryDataset::new())
        .with(sweep(x, 0.0, 1.0, 5))
        .with(m)
        .build()?;
    let report = scan.run_with_progress(&CancelToken::new(), &mut progress)?;

    assert_eq!(report.completed_points, 5);
    let counts = progress.counts();
    assert_eq!(counts.advanced, 5);
    assert_eq!(counts.closed, 1);

    let stats = &report.action_stats;
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].count, 5);
    assert_eq!(stats[1].count, 5);
    Ok(())
}

#[test]
fn zero_dimensional_scan_measures_once() -> TestResult {
    let (_, m) = counter("temperature_sensor");

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .with(m)
        .build()?;
    assert_eq!(scan.name(), "0D_temperatur");

    let report = scan.run()?;
    assert_eq!(report.completed_points, 1);
    assert_eq!(scan.dataset().records().len(), 1);
    assert!(scan.dataset().records()[0].setpoints.is_empty());
    Ok(())
}

#[test]
fn dataset_outlives_the_scan() -> TestResult {
    let (_, x) = memory("x", 0.0);
    let (_, a) = counter("a");
    let (_, b) = counter("b");

    let mut scan = Scan::builder(MemoryDataset::new())
        .silent(true)
        .with(Setter::new(x, [1.0, 2.0, 3.0]))
        .with(a)
        .with(b)
        .build()?;
    scan.run()?;

    let dataset = scan.into_dataset();
    assert_eq!(dataset.records().len(), 6);

    let b_values: Vec<Value> = dataset.records_for("b").map(|r| r.value.clone()).collect();
    assert_eq!(b_values, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    assert_eq!(dataset.records_for("missing").count(), 0);
    Ok(())
}
