//! The DSE worker pool (spec §5): one OS-level process per candidate run,
//! not a thread, because tool adapters fork external processes and each
//! candidate needs its own environment.
//!
//! Grounded on `crates/xchecker-utils/src/runner/native.rs`'s
//! thread + `mpsc::channel` + `recv_timeout` timeout idiom, adapted from
//! "wait for one child's output" to "wait for a swarm of self-re-exec'd
//! children". Termination on timeout mirrors
//! `xeda-process`'s `harness::terminate` (SIGTERM then SIGKILL on unix).

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use xeda_design::Design;
use xeda_engine::LauncherSettings;

use crate::error::DseError;
use crate::outcome::FlowOutcome;

/// The hidden CLI argument that switches the re-exec'd child into worker
/// mode instead of normal CLI dispatch (spec §5's "no new executable,
/// the same binary re-invokes itself").
pub const WORKER_ARG: &str = "--xeda-dse-worker";

/// Everything one worker process needs to launch a single candidate flow,
/// handed over stdin as one line of JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerJob {
    pub idx: usize,
    pub xeda_run_dir: Utf8PathBuf,
    pub launcher_settings: LauncherSettings,
    pub flow_name: String,
    pub design: Design,
    pub flow_settings: Value,
    pub copy_resources: Vec<Utf8PathBuf>,
}

/// What a worker reports back over stdout, mirroring the original
/// `Executioner`'s `(FlowOutcome | None, idx)` pair: `outcome` is `None`
/// when the flow itself failed cleanly (a logged failure, not a crash),
/// and `error` is set only for conditions the worker could not recover
/// from (e.g. an unknown flow name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub idx: usize,
    pub outcome: Option<FlowOutcome>,
    pub error: Option<String>,
}

/// Entry point the hosting binary calls when invoked with [`WORKER_ARG`]
/// as its first argument. Reads one [`WorkerJob`] as a line of JSON from
/// stdin, launches it, and writes one [`WorkerResponse`] as a line of
/// JSON to stdout.
pub fn worker_main() -> std::io::Result<()> {
    let mut input = String::new();
    std::io::stdin().read_line(&mut input).map(|_| ())?;
    // A job may contain a multi-line design (paths with newlines are not
    // realistic, but settings payloads can be large); read until EOF if
    // the first line didn't parse as complete JSON.
    let job: WorkerJob = match serde_json::from_str(&input) {
        Ok(job) => job,
        Err(_) => {
            use std::io::Read;
            std::io::stdin().read_to_string(&mut input)?;
            serde_json::from_str(&input).expect("worker job payload must be valid JSON")
        }
    };

    let response = run_job(job);
    let line = serde_json::to_string(&response).expect("WorkerResponse always serializes");
    println!("{line}");
    Ok(())
}

fn run_job(job: WorkerJob) -> WorkerResponse {
    let launcher = match xeda_engine::Launcher::new(job.xeda_run_dir.clone(), job.launcher_settings) {
        Ok(launcher) => launcher,
        Err(e) => {
            return WorkerResponse {
                idx: job.idx,
                outcome: None,
                error: Some(e.to_string()),
            }
        }
    };

    match launcher.launch(
        &job.flow_name,
        job.design,
        job.flow_settings,
        false,
        job.copy_resources,
    ) {
        Ok(flow) => WorkerResponse {
            idx: job.idx,
            outcome: Some(FlowOutcome {
                settings_snapshot: flow.settings_value().clone(),
                results: flow.results().clone(),
                timestamp: Some(chrono::Utc::now().to_rfc3339()),
                run_path: Some(flow.run_path().to_owned()),
            }),
            error: None,
        },
        Err(e) => WorkerResponse {
            idx: job.idx,
            outcome: None,
            error: Some(e.to_string()),
        },
    }
}

/// Run `jobs` concurrently, each in its own re-exec'd worker process,
/// enforcing `timeout` per job. Grounded on `dse_runner.py`'s
/// `pool.map(executioner, args, timeout=...)`: a timed-out or crashed
/// worker yields `(idx, None)` rather than aborting the whole batch
/// (spec §5's partial-failure tolerance), and the batch preserves the
/// caller's `idx` values rather than submission order.
pub fn run_worker_pool(
    jobs: Vec<WorkerJob>,
    max_workers: usize,
    timeout: Duration,
) -> Result<Vec<(usize, Option<FlowOutcome>)>, DseError> {
    let exe = std::env::current_exe().map_err(|_| DseError::WorkerExecutableNotFound)?;
    let max_workers = max_workers.max(1);

    let mut results = Vec::with_capacity(jobs.len());
    for chunk in jobs.chunks(max_workers) {
        let handles: Vec<_> = chunk
            .iter()
            .cloned()
            .map(|job| spawn_worker(&exe, job, timeout))
            .collect();
        for handle in handles {
            results.push(handle.join());
        }
    }
    Ok(results)
}

struct WorkerHandle {
    idx: usize,
    rx: mpsc::Receiver<std::io::Result<std::process::Output>>,
    join: thread::JoinHandle<()>,
    child_id: Option<u32>,
    timeout: Duration,
}

impl WorkerHandle {
    fn join(self) -> (usize, Option<FlowOutcome>) {
        match self.rx.recv_timeout(self.timeout) {
            Ok(Ok(output)) => {
                let _ = self.join.join();
                let stdout = String::from_utf8_lossy(&output.stdout);
                let response = stdout
                    .lines()
                    .rev()
                    .find_map(|line| serde_json::from_str::<WorkerResponse>(line).ok());
                match response {
                    Some(r) => (r.idx, r.outcome),
                    None => {
                        tracing::warn!(
                            idx = self.idx,
                            stderr = %String::from_utf8_lossy(&output.stderr),
                            "dse worker produced no parseable response"
                        );
                        (self.idx, None)
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(idx = self.idx, error = %e, "dse worker wait failed");
                (self.idx, None)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if let Some(pid) = self.child_id {
                    terminate_pid(pid);
                }
                let _ = self.join.join();
                tracing::warn!(idx = self.idx, timeout_seconds = self.timeout.as_secs(), "dse worker timed out");
                (self.idx, None)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::warn!(idx = self.idx, "dse worker thread terminated unexpectedly");
                (self.idx, None)
            }
        }
    }
}

fn spawn_worker(exe: &std::path::Path, job: WorkerJob, timeout: Duration) -> WorkerHandle {
    let idx = job.idx;
    let payload = serde_json::to_string(&job).expect("WorkerJob always serializes");

    let mut command = Command::new(exe);
    command
        .arg(WORKER_ARG)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            let (tx, rx) = mpsc::channel();
            let _ = tx.send(Err(e));
            return WorkerHandle {
                idx,
                rx,
                join: thread::spawn(|| {}),
                child_id: None,
                timeout,
            };
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(payload.as_bytes());
        let _ = stdin.write_all(b"\n");
    }

    let child_id = child.id();
    let (tx, rx) = mpsc::channel();
    let join = thread::spawn(move || {
        let output = child.wait_with_output();
        let _ = tx.send(output);
    });

    WorkerHandle {
        idx,
        rx,
        join,
        child_id: Some(child_id),
        timeout,
    }
}

#[cfg(unix)]
fn terminate_pid(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    let pid = Pid::from_raw(pid as i32);
    let _ = kill(pid, Signal::SIGTERM);
    thread::sleep(Duration::from_millis(500));
    let _ = kill(pid, Signal::SIGKILL);
}

#[cfg(not(unix))]
fn terminate_pid(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use serde_json::json;
    use xeda_design::{Design, Language, RtlSettings, TbSettings};

    #[test]
    fn worker_response_round_trips_through_json() {
        let response = WorkerResponse {
            idx: 3,
            outcome: None,
            error: Some("boom".to_string()),
        };
        let json = serde_json::to_string(&response).unwrap();
        let restored: WorkerResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.idx, 3);
        assert_eq!(restored.error.as_deref(), Some("boom"));
    }

    /// A [`WorkerJob`] must cross the same wire format a real re-exec'd
    /// worker reads from stdin, so it needs to round-trip byte-for-byte
    /// through JSON the way [`worker_main`] parses it.
    #[test]
    fn worker_job_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let design = Design {
            name: "top".to_string(),
            rtl: RtlSettings::default(),
            tb: TbSettings::default(),
            language: Language::default(),
            root_path: root.to_owned(),
        };
        let job = WorkerJob {
            idx: 2,
            xeda_run_dir: root.join("xeda_run_dse"),
            launcher_settings: LauncherSettings::default(),
            flow_name: "vivado_synth".to_string(),
            design,
            flow_settings: json!({"clock_period": 4.0}),
            copy_resources: vec![],
        };
        let payload = serde_json::to_string(&job).unwrap();
        let restored: WorkerJob = serde_json::from_str(&payload).unwrap();
        assert_eq!(restored.idx, 2);
        assert_eq!(restored.flow_name, "vivado_synth");
        assert_eq!(restored.design.name, "top");
        assert_eq!(restored.flow_settings["clock_period"], json!(4.0));
    }
}
