use camino::Utf8PathBuf;
use xeda_flow::FlowError;

/// Errors the Launcher can surface (spec §4.8, §7), layered on top of
/// [`FlowError`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("io error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    RunPath(#[from] xeda_runpath::RunPathError),

    #[error("failed to hash design or settings: {0}")]
    Hash(#[source] std::io::Error),
}
