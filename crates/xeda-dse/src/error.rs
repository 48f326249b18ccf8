use camino::Utf8PathBuf;
use xeda_engine::EngineError;

/// Errors the DSE driver and its worker pool can surface (spec §4.9, §7).
#[derive(Debug, thiserror::Error)]
pub enum DseError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("io error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("no worker executable could be located for the self-re-exec worker pool")]
    WorkerExecutableNotFound,

    #[error("init_freq_high ({high}) must be greater than init_freq_low ({low})")]
    InvalidFrequencyWindow { low: f64, high: f64 },

    #[error("'incremental' is incompatible with design-space exploration: concurrent workers would contend for the same run directory")]
    IncrementalNotSupported,
}
