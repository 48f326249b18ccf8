/// Settings controlling the Launcher itself, independent of any flow's own
/// settings. Grounded on
/// `original_source/src/xeda/flow_runner/default_runner.py`'s
/// `FlowLauncher.Settings`.
///
/// Serializable so a worker process in the design-space exploration pool
/// (`xeda-dse`) can receive the same launcher configuration its parent
/// was given, across the process boundary.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LauncherSettings {
    pub debug: bool,
    pub dump_settings_json: bool,
    pub display_results: bool,
    pub dump_results_json: bool,
    pub cached_dependencies: bool,
    pub skip_if_previous_run_exists: bool,
    pub backups: bool,
    pub incremental: bool,
    pub clean: bool,
    /// Remove flow files except settings.json/results.json/artifacts after running.
    pub post_cleanup: bool,
    /// Remove the entire run directory after running.
    pub post_cleanup_purge: bool,
    /// Remove sibling run directories of the same flow before running.
    pub scrub_old_runs: bool,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            debug: false,
            dump_settings_json: true,
            display_results: true,
            dump_results_json: true,
            cached_dependencies: true,
            skip_if_previous_run_exists: false,
            backups: false,
            incremental: false,
            clean: false,
            post_cleanup: false,
            post_cleanup_purge: false,
            scrub_old_runs: false,
        }
    }
}
