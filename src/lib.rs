// src/lib.rs

pub mod cli;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod plan;
pub mod scan;
pub mod types;

use std::path::PathBuf;
use std::sync::PoisonError;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::engine::{JobHandle, JobState, Scheduler};
use crate::plan::{PlannedScan, build_endpoints, build_scans};
use crate::scan::SharedDataset;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - simulated endpoints and scan plans
/// - the job scheduler
/// - Ctrl-C handling (cancels every queued and running scan)
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let endpoints = build_endpoints(&cfg);
    let planned = build_scans(&cfg, &endpoints)?;

    if args.dry_run {
        print_dry_run(&cfg, &planned);
        return Ok(());
    }

    let scheduler = Scheduler::start();

    let mut submitted: Vec<(JobHandle, SharedDataset)> = Vec::new();
    for PlannedScan {
        scan,
        dataset,
        priority,
    } in planned
    {
        let handle = scan.submit(&scheduler, priority);
        submitted.push((handle, dataset));
    }
    info!(jobs = submitted.len(), "all scans submitted");

    tokio::select! {
        _ = scheduler.drain() => {
            debug!("scheduler drained");
        }
        res = tokio::signal::ctrl_c() => {
            match res {
                Ok(()) => {
                    let n = scheduler.cancel_all();
                    warn!(cancelled = n, "Ctrl-C received; cancelling scans");
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
            }
            scheduler.drain().await;
        }
    }

    scheduler.shutdown().await;
    print_summary(&submitted);

    let failed = submitted
        .iter()
        .filter(|(h, _)| h.state() == JobState::Failed)
        .count();
    if failed > 0 {
        anyhow::bail!("{failed} scan(s) failed");
    }
    Ok(())
}

fn print_summary(submitted: &[(JobHandle, SharedDataset)]) {
    println!("labscan summary");
    for (handle, dataset) in submitted {
        let dataset = dataset.lock().unwrap_or_else(PoisonError::into_inner);
        println!(
            "  - {} [{:?}] shape={:?} records={}",
            handle.name(),
            handle.state(),
            dataset.shape(),
            dataset.records().len()
        );
    }
}

/// Simple dry-run output: print every scan's plan without running it.
fn print_dry_run(cfg: &ConfigFile, planned: &[PlannedScan]) {
    println!("labscan dry-run");
    println!(
        "  scheduler.default_priority = {}",
        cfg.scheduler.default_priority
    );
    println!();

    println!("endpoints ({}):", cfg.endpoint.len());
    for ep in &cfg.endpoint {
        println!("  - {} ({:?})", ep.name, ep.kind);
    }
    println!();

    println!("scans ({}):", planned.len());
    for p in planned {
        println!("  - {} (priority {})", p.scan.name(), p.priority);
        println!("      shape: {:?}", p.scan.loop_shape());
        println!("      points: {}", p.scan.total_points());
        for action in p.scan.actions() {
            println!("      {}", action.name());
        }
    }

    debug!("dry-run complete (no execution)");
}
