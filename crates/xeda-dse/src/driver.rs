//! The DSE driver loop (spec §4.9): repeatedly pulls a batch from the
//! optimizer, launches it across the worker pool, folds outcomes back in,
//! and persists the running best result.
//!
//! Grounded on
//! `original_source/src/xeda/flow_runner/dse/dse_runner.py`'s
//! `Dse.run_flow`.

use std::collections::HashSet;
use std::fs;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde_json::{json, Value};
use sysinfo::System;
use xeda_design::Design;
use xeda_engine::LauncherSettings;

use crate::error::DseError;
use crate::optimizer::Optimizer;
use crate::outcome::FlowOutcome;
use crate::worker::{run_worker_pool, WorkerJob};

/// `Dse.Settings` (spec §4.9): stop conditions and worker-pool sizing for
/// one design-space exploration run. `incremental` is deliberately absent
/// here — [`DseSettings::launcher_settings`] always forces it off (spec
/// §5: incremental runs and concurrent DSE workers would contend for the
/// same run directory).
#[derive(Debug, Clone)]
pub struct DseSettings {
    pub max_runtime_minutes: u64,
    pub keep_optimal_run_dirs: bool,
    pub max_failed_iters: u32,
    pub max_failed_iters_with_best: u32,
    pub max_workers: usize,
    pub per_job_timeout: Duration,
    pub scrub_old_runs: bool,
}

impl Default for DseSettings {
    fn default() -> Self {
        Self {
            max_runtime_minutes: 12 * 60,
            keep_optimal_run_dirs: false,
            max_failed_iters: 6,
            max_failed_iters_with_best: 4,
            max_workers: num_cpus::get_physical().max(1),
            per_job_timeout: Duration::from_secs(90 * 60),
            scrub_old_runs: false,
        }
    }
}

impl DseSettings {
    /// The launcher configuration every worker job carries (spec §5,
    /// `Dse.__init__`'s forced overrides): `display_results` and
    /// `incremental` are always off, and post-cleanup is suppressed when
    /// the caller wants to keep every improved run directory.
    fn launcher_settings(&self) -> LauncherSettings {
        LauncherSettings {
            display_results: false,
            incremental: false,
            post_cleanup: false,
            post_cleanup_purge: !self.keep_optimal_run_dirs,
            scrub_old_runs: self.scrub_old_runs,
            ..LauncherSettings::default()
        }
    }
}

/// The persisted best-result file schema (spec §6): written after every
/// improvement so a killed run leaves a usable artifact behind.
#[derive(Debug, Clone, serde::Serialize)]
struct BestResultFile {
    best: Option<FlowOutcome>,
    successful_results: Vec<Value>,
    total_time_seconds: f64,
    num_iterations: u32,
    consecutive_failed_iters: u32,
    design: Design,
}

/// Runs an [`Optimizer`] against `flow_name`/`design` through the worker
/// pool until a stop condition trips, persisting the best outcome to
/// `best_json_path` after every improvement. Mirrors `Dse.run_flow`.
pub fn run_flow(
    optimizer: &mut dyn Optimizer,
    flow_name: &str,
    design: Design,
    xeda_run_dir: Utf8PathBuf,
    settings: &DseSettings,
    best_json_path: &Utf8PathBuf,
) -> Result<(), DseError> {
    let start = Instant::now();
    let mut consecutive_failed_iters: u32 = 0;
    let mut num_iterations: u32 = 0;
    let mut successful_results: Vec<Value> = Vec::new();
    let mut flow_setting_hashes: HashSet<String> = HashSet::new();
    let launcher_settings = settings.launcher_settings();

    loop {
        log_resource_usage();

        if consecutive_failed_iters > settings.max_failed_iters {
            tracing::info!(consecutive_failed_iters, "stopping after repeated unsuccessful iterations");
            break;
        }
        if optimizer.best().is_some() && consecutive_failed_iters > settings.max_failed_iters_with_best {
            tracing::info!(consecutive_failed_iters, "stopping: best result already found and iterations keep failing");
            break;
        }
        let elapsed_minutes = start.elapsed().as_secs() / 60;
        if elapsed_minutes > settings.max_runtime_minutes {
            tracing::warn!(elapsed_minutes, max = settings.max_runtime_minutes, "exceeded max_runtime_minutes");
            break;
        }

        let Some(batch) = optimizer.next_batch() else {
            break;
        };

        let mut this_batch = Vec::new();
        for candidate in batch {
            let hash = xeda_hash::fingerprint(&candidate).unwrap_or_default();
            if flow_setting_hashes.insert(hash) {
                this_batch.push(candidate);
            }
        }
        this_batch.truncate(settings.max_workers);
        if this_batch.is_empty() {
            break;
        }

        let jobs: Vec<WorkerJob> = this_batch
            .into_iter()
            .enumerate()
            .map(|(idx, flow_settings)| WorkerJob {
                idx,
                xeda_run_dir: xeda_run_dir.clone(),
                launcher_settings: launcher_settings.clone(),
                flow_name: flow_name.to_string(),
                design: design.clone(),
                flow_settings,
                copy_resources: Vec::new(),
            })
            .collect();

        tracing::info!(iteration = num_iterations, batch_len = jobs.len(), "starting dse iteration");
        let outcomes = run_worker_pool(jobs, settings.max_workers, settings.per_job_timeout)?;

        let mut have_success = false;
        for (idx, outcome) in outcomes {
            let Some(outcome) = outcome else {
                tracing::warn!(idx, "worker produced no outcome");
                continue;
            };
            let improved = optimizer.process_outcome(&outcome, idx);
            if improved {
                tracing::info!(idx, "writing improved result");
                persist_best_result(
                    optimizer.best(),
                    &successful_results,
                    start.elapsed().as_secs_f64(),
                    num_iterations,
                    consecutive_failed_iters,
                    &design,
                    best_json_path,
                )?;
            }
            if outcome.results.success {
                have_success = true;
                successful_results.push(json!({
                    "Fmax": outcome.result_f64("Fmax"),
                    "lut": outcome.result_value("lut"),
                    "ff": outcome.result_value("ff"),
                    "slice": outcome.result_value("slice"),
                    "latch": outcome.result_value("latch"),
                    "bram_tile": outcome.result_value("bram_tile"),
                    "dsp": outcome.result_value("dsp"),
                }));
            }
            if launcher_settings.post_cleanup_purge && !improved && (have_success || num_iterations > 0) {
                if let Some(run_path) = &outcome.run_path {
                    if run_path.exists() {
                        let _ = fs::remove_dir_all(run_path);
                    }
                }
            }
        }

        consecutive_failed_iters = if have_success { 0 } else { consecutive_failed_iters + 1 };
        num_iterations += 1;
        tracing::info!(num_iterations, "end of dse iteration");
    }

    Ok(())
}

fn persist_best_result(
    best: Option<&FlowOutcome>,
    successful_results: &[Value],
    total_time_seconds: f64,
    num_iterations: u32,
    consecutive_failed_iters: u32,
    design: &Design,
    path: &Utf8PathBuf,
) -> Result<(), DseError> {
    let payload = BestResultFile {
        best: best.cloned(),
        successful_results: successful_results.to_vec(),
        total_time_seconds,
        num_iterations,
        consecutive_failed_iters,
        design: design.clone(),
    };
    let text = serde_json::to_string_pretty(&payload)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| DseError::Io {
            path: parent.to_owned(),
            source,
        })?;
    }
    fs::write(path.as_std_path(), text).map_err(|source| DseError::Io {
        path: path.clone(),
        source,
    })
}

/// CPU load average and RAM usage (spec §4.9: logged once per iteration
/// so an operator watching a long DSE run can see resource pressure
/// building). Mirrors `psutil.getloadavg()` / `psutil.virtual_memory()`.
fn log_resource_usage() {
    let load = System::load_average();
    let mut sys = System::new();
    sys.refresh_memory();
    let ram_pct = if sys.total_memory() > 0 {
        (sys.used_memory() as f64 / sys.total_memory() as f64) * 100.0
    } else {
        0.0
    };
    tracing::info!(
        load_1m = load.one,
        load_5m = load.five,
        load_15m = load.fifteen,
        ram_pct,
        "resource usage before dse iteration"
    );
}
