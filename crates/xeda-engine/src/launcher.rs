use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{json, Value};
use std::fs;
use std::time::Instant;
use xeda_design::Design;
use xeda_flow::{Flow, FlowError, FlowResults};
use xeda_process::ProcessError;

use crate::error::EngineError;
use crate::settings::LauncherSettings;

const XEDA_VERSION: &str = env!("CARGO_PKG_VERSION");

fn io_err(path: &Utf8Path, source: std::io::Error) -> EngineError {
    EngineError::Io {
        path: path.to_owned(),
        source,
    }
}

/// Drives flows through their full lifecycle: cache lookup, run-path
/// setup, dependency recursion, execution, and settings/results
/// persistence (spec §4.8). Grounded on
/// `original_source/src/xeda/flow_runner/default_runner.py`'s
/// `FlowLauncher`.
pub struct Launcher {
    pub xeda_run_dir: Utf8PathBuf,
    pub settings: LauncherSettings,
}

impl Launcher {
    pub fn new(xeda_run_dir: impl Into<Utf8PathBuf>, settings: LauncherSettings) -> Result<Self, EngineError> {
        let xeda_run_dir = xeda_run_dir.into();
        fs::create_dir_all(&xeda_run_dir).map_err(|e| io_err(&xeda_run_dir, e))?;
        Ok(Self {
            xeda_run_dir,
            settings,
        })
    }

    /// `launch(flow_name, design, settings, depender=None, copy_resources=[])`
    /// (spec §4.8). `is_dependency` replaces the Python `depender` object:
    /// only its truthiness is used by the cache-hit rule, so callers pass
    /// `true` when launching on behalf of another flow.
    pub fn launch(
        &self,
        flow_name: &str,
        design: Design,
        flow_settings: Value,
        is_dependency: bool,
        copy_resources: Vec<Utf8PathBuf>,
    ) -> Result<Box<dyn Flow>, EngineError> {
        // Step 2: design_hash / flowrun_hash. Settings are validated by the
        // flow's own constructor at step 7; the hash is taken over the
        // merged-but-not-yet-validated settings payload, which is stable
        // under validation (defaulting only adds keys the caller omitted).
        // Non-semantic fields (verbosity, debug, thread count, output
        // bookkeeping paths) are stripped first so that e.g. a `verbose`
        // override alone never changes the run path (spec §4.1).
        let design_hash = design.design_hash().map_err(EngineError::Hash)?;
        let semantic_flow_settings = xeda_flow::strip_non_semantic_fields(&flow_settings);
        let flowrun_hash = xeda_hash::fingerprint(&json!({
            "flow_name": flow_name,
            "flow_settings": semantic_flow_settings,
        }))
        .map_err(|e| EngineError::Hash(std::io::Error::other(e.to_string())))?;

        // Step 3.
        let run_path = xeda_runpath::flow_run_path(
            &self.xeda_run_dir,
            &design.name,
            flow_name,
            Some(&design_hash),
            Some(&flowrun_hash),
            self.settings.cached_dependencies,
            self.settings.incremental,
        );

        let settings_json_path = run_path.join("settings.json");
        let results_json_path = run_path.join("results.json");

        // Step 4: cache check.
        let previous_results = if (is_dependency || self.settings.skip_if_previous_run_exists)
            && self.settings.cached_dependencies
            && run_path.is_dir()
            && settings_json_path.is_file()
            && results_json_path.is_file()
        {
            load_cache_hit(&settings_json_path, &results_json_path, flow_name, &design_hash, &flowrun_hash)
        } else {
            None
        };

        // Step 5: scrub sibling runs of the same flow before reusing this one.
        if self.settings.scrub_old_runs {
            if let Some(parent) = run_path.parent() {
                let candidates = xeda_runpath::find_scrub_candidates(
                    flow_name,
                    parent,
                    std::slice::from_ref(&run_path),
                )?;
                if !candidates.is_empty() {
                    tracing::warn!(count = candidates.len(), flow = flow_name, "scrubbing stale run directories");
                    xeda_runpath::remove_candidates(&candidates)?;
                }
            }
        }

        // Step 6: back up or remove a stale run directory.
        if previous_results.is_none() && run_path.exists() {
            if !self.settings.incremental {
                if self.settings.backups {
                    xeda_runpath::backup_existing(&run_path)?;
                } else {
                    fs::remove_dir_all(&run_path).map_err(|e| io_err(&run_path, e))?;
                }
            }
        }
        if !run_path.exists() {
            fs::create_dir_all(&run_path).map_err(|e| io_err(&run_path, e))?;
        }

        // Step 7: instantiate.
        let mut flow = xeda_flow::construct(flow_name, flow_settings.clone(), design.clone(), run_path.clone())?;

        if previous_results.is_none() {
            if self.settings.clean {
                flow.clean()?;
            }
            flow.init()?;
        }

        let flow = if let Some(previous) = previous_results {
            // Cache hit: skip run()/parse_reports() entirely.
            tracing::info!(flow = flow_name, run_path = %run_path, "reusing cached results");
            let results: FlowResults = serde_json::from_value(previous)?;
            *flow.artifacts_mut() = results.artifacts.clone();
            *flow.results_mut() = results;
            flow
        } else {
            self.run_fresh(
                flow,
                &design,
                flow_name,
                &design_hash,
                &flowrun_hash,
                &flow_settings,
                &run_path,
                &settings_json_path,
                &results_json_path,
                copy_resources,
            )?
        };

        // Post-cleanup policy (step 14).
        if self.settings.post_cleanup_purge {
            tracing::warn!(run_path = %run_path, "purging flow run path");
            fs::remove_dir_all(&run_path).map_err(|e| io_err(&run_path, e))?;
        } else if self.settings.post_cleanup {
            self.apply_post_cleanup(&flow, &run_path, &settings_json_path, &results_json_path)?;
        }

        Ok(flow)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_fresh(
        &self,
        mut flow: Box<dyn Flow>,
        design: &Design,
        flow_name: &str,
        design_hash: &str,
        flowrun_hash: &str,
        flow_settings: &Value,
        run_path: &Utf8Path,
        settings_json_path: &Utf8Path,
        results_json_path: &Utf8Path,
        copy_resources: Vec<Utf8PathBuf>,
    ) -> Result<Box<dyn Flow>, EngineError> {
        flow.results_mut().extra.insert("design".into(), json!(design.name));
        flow.results_mut().extra.insert("flow".into(), json!(flow_name));
        flow.results_mut().extra.insert("run_path".into(), json!(run_path.to_string()));

        // Step 8: settings.json.
        if self.settings.dump_settings_json {
            let record = json!({
                "design": design.to_settings_json().map_err(EngineError::Hash)?,
                "design_hash": design_hash,
                "rtl_fingerprint": design.rtl_fingerprint().map_err(EngineError::Hash)?,
                "rtl_hash": design.rtl_hash().map_err(EngineError::Hash)?,
                "flow_name": flow_name,
                "flow_settings": flow_settings,
                "xeda_version": XEDA_VERSION,
                "flowrun_hash": flowrun_hash,
            });
            write_json_atomic(settings_json_path, &record, self.settings.backups)?;
        }

        copy_resources_into(run_path, &copy_resources)?;

        // Step 9: dependencies, in declaration order.
        for dep in flow.take_pending_dependencies() {
            let resources: Vec<Utf8PathBuf> = dep
                .copy_resources
                .iter()
                .map(|r| if r.is_absolute() { r.clone() } else { run_path.join(r) })
                .filter(|p| p.exists())
                .collect();
            let completed = self.launch(&dep.flow_name, design.clone(), dep.settings, true, resources)?;
            if !completed.results().success {
                return Err(FlowError::DependencyFailure {
                    depender: flow_name.to_string(),
                    dependency: dep.flow_name,
                }
                .into());
            }
            flow.push_completed_dependency(completed);
        }

        // Step 10: run().
        let start = Instant::now();
        let mut success = true;
        match flow.run() {
            Ok(()) => {}
            Err(FlowError::Process(ProcessError::NonZeroExitCode { argv, code })) => {
                tracing::error!(?argv, code, "tool exited non-zero");
                success = false;
            }
            Err(FlowError::Process(ProcessError::TimeoutExpired { argv, timeout_seconds })) => {
                tracing::error!(?argv, timeout_seconds, "tool timed out");
                success = false;
            }
            Err(other) => return Err(other.into()),
        }

        // Step 11.
        flow.results_mut().runtime = Some(start.elapsed().as_secs_f64());

        // Step 12: report parsing is skipped when run() already failed
        // (spec §7 propagation policy: "default: skip parsing on run
        // failure", a deliberate departure from the original, which always
        // parses).
        if success {
            success &= flow.parse_reports()?;
        }
        flow.results_mut().success = success;
        flow.results_mut().extra.insert(
            "timestamp".into(),
            json!(chrono::Utc::now().format("%Y-%m-%d-%H%M%S").to_string()),
        );

        for (key, value) in flow.artifacts().clone() {
            flow.results_mut().artifacts.entry(key).or_insert(value);
        }

        // Step 13: results.json.
        if self.settings.dump_results_json {
            let record = serde_json::to_value(flow.results())?;
            write_json_atomic(results_json_path, &record, self.settings.backups)?;
        }

        Ok(flow)
    }

    fn apply_post_cleanup(
        &self,
        flow: &dyn Flow,
        run_path: &Utf8Path,
        settings_json_path: &Utf8Path,
        results_json_path: &Utf8Path,
    ) -> Result<(), EngineError> {
        let mut keep: Vec<Utf8PathBuf> = vec![settings_json_path.to_owned(), results_json_path.to_owned()];
        for value in flow.artifacts().values() {
            if let Some(s) = value.as_str() {
                let path = Utf8PathBuf::from(s);
                keep.push(if path.is_absolute() { path } else { run_path.join(path) });
            }
        }
        let Ok(entries) = fs::read_dir(run_path) else {
            return Ok(());
        };
        for entry in entries {
            let entry = entry.map_err(|e| io_err(run_path, e))?;
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                continue;
            };
            if keep.contains(&path) {
                continue;
            }
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(e) = result {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(io_err(&path, e));
                }
            }
        }
        Ok(())
    }
}

fn copy_resources_into(run_path: &Utf8Path, resources: &[Utf8PathBuf]) -> Result<(), EngineError> {
    let existing: Vec<&Utf8PathBuf> = resources.iter().filter(|p| p.is_file()).collect();
    if existing.is_empty() {
        return Ok(());
    }
    let dest_dir = run_path.join("copied_resources");
    fs::create_dir_all(&dest_dir).map_err(|e| io_err(&dest_dir, e))?;
    for res in existing {
        let Some(name) = res.file_name() else { continue };
        let dest = dest_dir.join(name);
        fs::copy(res, &dest).map_err(|e| io_err(&dest, e))?;
    }
    Ok(())
}

fn load_cache_hit(
    settings_json_path: &Utf8Path,
    results_json_path: &Utf8Path,
    flow_name: &str,
    design_hash: &str,
    flowrun_hash: &str,
) -> Option<Value> {
    let settings_text = fs::read_to_string(settings_json_path).ok()?;
    let results_text = fs::read_to_string(results_json_path).ok()?;
    let prev_settings: Value = serde_json::from_str(&settings_text).ok()?;
    let prev_results: Value = serde_json::from_str(&results_text).ok()?;

    let success = prev_results.get("success").and_then(Value::as_bool).unwrap_or(false);
    if !success {
        return None;
    }
    let matches = prev_settings.get("flow_name").and_then(Value::as_str) == Some(flow_name)
        && prev_settings.get("design_hash").and_then(Value::as_str) == Some(design_hash)
        && prev_settings.get("flowrun_hash").and_then(Value::as_str) == Some(flowrun_hash);
    if !matches {
        tracing::warn!(path = %settings_json_path, "cached settings do not match expected flow/design hash");
        return None;
    }
    Some(prev_results)
}

fn write_json_atomic(path: &Utf8Path, value: &Value, backup: bool) -> Result<(), EngineError> {
    if backup && path.exists() {
        xeda_runpath::backup_existing(path)?;
    }
    let text = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &text).map_err(|e| io_err(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}
