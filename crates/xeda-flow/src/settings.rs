use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A `(name, path)` library reference; either side may be absent (spec
/// §4.7 `lib_paths`). Grounded on `flow.py`'s `Settings.lib_paths` field,
/// whose validator accepts a bare string, a `(name, None)` pair, or a
/// `(None, path)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibPath {
    pub name: Option<String>,
    pub path: Option<Utf8PathBuf>,
}

/// Settings common to every flow, independent of the tool it wraps.
/// Grounded on `original_source/src/xeda/flow/flow.py`'s `Flow.Settings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CommonSettings {
    #[serde(default)]
    pub verbose: u32,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub redirect_stdout: bool,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default, alias = "ncpus")]
    pub nthreads: Option<usize>,
    #[serde(default)]
    pub no_console: bool,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: Utf8PathBuf,
    #[serde(default = "default_checkpoints_dir")]
    pub checkpoints_dir: Utf8PathBuf,
    #[serde(default = "default_outputs_dir")]
    pub outputs_dir: Utf8PathBuf,
    #[serde(default)]
    pub clean: bool,
    #[serde(default)]
    pub lib_paths: Vec<LibPath>,
    #[serde(default)]
    pub docker: Option<String>,
    #[serde(default)]
    pub dockerized: bool,
    #[serde(default = "default_true")]
    pub print_commands: bool,
}

fn default_timeout_seconds() -> u64 {
    3600 * 2
}
fn default_reports_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("reports")
}
fn default_checkpoints_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("checkpoints")
}
fn default_outputs_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("outputs")
}
fn default_true() -> bool {
    true
}

impl Default for CommonSettings {
    fn default() -> Self {
        Self {
            verbose: 0,
            debug: false,
            quiet: false,
            redirect_stdout: false,
            timeout_seconds: default_timeout_seconds(),
            nthreads: None,
            no_console: false,
            reports_dir: default_reports_dir(),
            checkpoints_dir: default_checkpoints_dir(),
            outputs_dir: default_outputs_dir(),
            clean: false,
            lib_paths: Vec::new(),
            docker: None,
            dockerized: false,
            print_commands: true,
        }
    }
}

impl CommonSettings {
    /// `quiet` is forced off when `verbose` or `debug` is set (spec §4.7,
    /// mirroring `flow.py`'s `_validate_quiet`).
    pub fn normalize(&mut self) {
        if self.verbose > 0 || self.debug {
            self.quiet = false;
        }
    }
}

/// Top-level settings keys excluded from the flow-hash fingerprint (spec
/// §4.1): they affect logging verbosity or output bookkeeping locations,
/// not a flow's observable behavior, so toggling one alone must not
/// change a run's cache key or run path.
pub const NON_SEMANTIC_FIELDS: &[&str] = &[
    "verbose",
    "debug",
    "nthreads",
    "reports_dir",
    "outputs_dir",
    "checkpoints_dir",
];

/// Drop [`NON_SEMANTIC_FIELDS`] from a flow-settings JSON object before it
/// is hashed into a `flowrun_hash`. Non-object values pass through
/// unchanged since there are no fields to strip.
pub fn strip_non_semantic_fields(settings: &Value) -> Value {
    match settings {
        Value::Object(map) => {
            let mut stripped = map.clone();
            for key in NON_SEMANTIC_FIELDS {
                stripped.remove(*key);
            }
            Value::Object(stripped)
        }
        other => other.clone(),
    }
}
