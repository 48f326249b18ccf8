use xeda_process::ProcessError;
use xeda_report::ReportParseError;
use xeda_settings::SettingsValidationError;

/// Errors raised by a `Flow`'s lifecycle methods or by the launcher while
/// driving it (spec §4.7, §4.8, §7). Grounded on
/// `original_source/src/xeda/flow/flow.py`'s `FlowException` hierarchy
/// (`FlowSettingsError`, `FlowDependencyFailure`, `FlowFatalError`).
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Settings(#[from] SettingsValidationError),

    #[error("no flow registered under the name '{0}'")]
    UnknownFlow(String),

    #[error("dependency '{dependency}' of flow '{depender}' failed")]
    DependencyFailure { depender: String, dependency: String },

    #[error("no completed dependency of type '{0}' is available")]
    MissingCompletedDependency(String),

    #[error("fatal error in flow '{flow}': {message}")]
    Fatal { flow: String, message: String },

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Report(#[from] ReportParseError),

    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
