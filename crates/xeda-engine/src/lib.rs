//! The Flow Launcher (spec §4.8): cache lookup, run-path lifecycle,
//! dependency recursion, execution, and settings/results persistence.
//!
//! Grounded on `original_source/src/xeda/flow_runner/default_runner.py`'s
//! `FlowLauncher._launch_flow`, generalized to operate over the
//! `xeda_flow::Flow` trait object instead of a concrete subclass.

mod error;
mod launcher;
mod settings;

pub use error::EngineError;
pub use launcher::Launcher;
pub use settings::LauncherSettings;
