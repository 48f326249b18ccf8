use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};
use xeda_design::Design;

use crate::error::FlowError;
use crate::results::FlowResults;

/// A dependency declared by `add_dependency` (spec §4.7): the dependency's
/// flow name (resolved through the registry by the launcher), its
/// settings (already-coerced JSON, checked against the dependency's own
/// `Settings` schema when it is launched), and resource paths — relative
/// to the depender's run-path — to copy into the dependency's run-path
/// under `copied_resources/`.
#[derive(Debug, Clone)]
pub struct DependencyRequest {
    pub flow_name: String,
    pub settings: Value,
    pub copy_resources: Vec<Utf8PathBuf>,
}

/// The contract every flow implements (spec §4.7). Object-safe so the
/// launcher (`xeda-engine`) can hold a heterogeneous dependency graph as
/// `Box<dyn Flow>`, the way `original_source/src/xeda/flow/flow.py`'s
/// `registered_flows` maps a name to any `Flow` subclass.
///
/// Settings are carried as `serde_json::Value` at this boundary rather
/// than as an associated type: a flow's own settings struct lives behind
/// the trait object and is validated once, in the concrete flow's
/// constructor, against its own `Settings` schema (spec §4.3's
/// `FlowSettingsError`).
pub trait Flow: Send {
    /// Stable registry name, e.g. `"vivado_synth"`.
    fn flow_name(&self) -> &str;

    fn run_path(&self) -> &Utf8Path;

    fn design(&self) -> &Design;

    /// The settings this instance was constructed with, as JSON (used for
    /// hashing and for `settings.json`).
    fn settings_value(&self) -> &Value;

    /// Custom initialization after construction. Settings may still be
    /// adjusted here based on the design; dependencies are normally
    /// registered here via [`Flow::add_dependency`] (spec §4.7).
    fn init(&mut self) -> Result<(), FlowError> {
        Ok(())
    }

    /// Orchestrate tool invocations. Runs with cwd set to `run_path`.
    fn run(&mut self) -> Result<(), FlowError>;

    /// Parse generated reports into `results()`; returns overall success.
    /// Default: no reports to parse, flow succeeded.
    fn parse_reports(&mut self) -> Result<bool, FlowError> {
        Ok(true)
    }

    /// Recursively delete the run-path's contents. Invoked by the
    /// launcher when the `clean` setting is true, before `init()`.
    fn clean(&self) -> Result<(), FlowError> {
        clean_dir(self.run_path())
    }

    fn artifacts(&self) -> &Map<String, Value>;
    fn artifacts_mut(&mut self) -> &mut Map<String, Value>;

    fn results(&self) -> &FlowResults;
    fn results_mut(&mut self) -> &mut FlowResults;

    /// Dependencies registered so far via `add_dependency`, not yet
    /// launched.
    fn pending_dependencies(&self) -> &[DependencyRequest];

    /// Drain `pending_dependencies` for the launcher to resolve in
    /// declaration order (spec §4.8 step 9).
    fn take_pending_dependencies(&mut self) -> Vec<DependencyRequest>;

    /// Append a just-completed dependency (spec §4.8 step 9).
    fn push_completed_dependency(&mut self, dep: Box<dyn Flow>);

    /// Remove and return the most recently completed dependency whose
    /// `flow_name` matches `name`, searching from the end (spec §4.7
    /// `pop_dependency`, LIFO by construction).
    fn pop_dependency(&mut self, name: &str) -> Result<Box<dyn Flow>, FlowError>;
}

/// Delete every entry under `path` without removing `path` itself.
/// Grounded on `flow.py`'s `Flow.clean`.
pub fn clean_dir(path: &Utf8Path) -> Result<(), FlowError> {
    if !path.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(path).map_err(|source| FlowError::Io {
        path: path.to_string(),
        source,
    })? {
        let entry = entry.map_err(|source| FlowError::Io {
            path: path.to_string(),
            source,
        })?;
        let entry_path = entry.path();
        let result = if entry_path.is_dir() {
            std::fs::remove_dir_all(&entry_path)
        } else {
            std::fs::remove_file(&entry_path)
        };
        if let Err(source) = result {
            if source.kind() != std::io::ErrorKind::NotFound {
                return Err(FlowError::Io {
                    path: entry_path.display().to_string(),
                    source,
                });
            }
        }
    }
    Ok(())
}

/// Shared state every concrete flow embeds (spec §4.7). Concrete flows
/// compose this rather than inherit from it — there is no base class in
/// Rust — and delegate the bookkeeping parts of [`Flow`] to it.
pub struct FlowState {
    pub flow_name: String,
    pub run_path: Utf8PathBuf,
    pub design: Design,
    pub settings_value: Value,
    pub artifacts: Map<String, Value>,
    pub results: FlowResults,
    pub pending_dependencies: Vec<DependencyRequest>,
    pub completed_dependencies: Vec<Box<dyn Flow>>,
}

impl FlowState {
    pub fn new(
        flow_name: impl Into<String>,
        run_path: Utf8PathBuf,
        design: Design,
        settings_value: Value,
    ) -> Self {
        Self {
            flow_name: flow_name.into(),
            run_path,
            design,
            settings_value,
            artifacts: Map::new(),
            results: FlowResults::default(),
            pending_dependencies: Vec::new(),
            completed_dependencies: Vec::new(),
        }
    }

    /// `add_dependency(flow_class, dep_settings, copy_resources=[])`
    /// (spec §4.7).
    pub fn add_dependency(
        &mut self,
        flow_name: impl Into<String>,
        settings: Value,
        copy_resources: Vec<Utf8PathBuf>,
    ) {
        self.pending_dependencies.push(DependencyRequest {
            flow_name: flow_name.into(),
            settings,
            copy_resources,
        });
    }

    pub fn pop_dependency(&mut self, name: &str) -> Result<Box<dyn Flow>, FlowError> {
        if let Some(pos) = self
            .completed_dependencies
            .iter()
            .rposition(|dep| dep.flow_name() == name)
        {
            Ok(self.completed_dependencies.remove(pos))
        } else {
            Err(FlowError::MissingCompletedDependency(name.to_string()))
        }
    }
}
