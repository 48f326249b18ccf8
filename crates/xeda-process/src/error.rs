use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors produced by the process harness (spec §4.4, §7).
///
/// Grounded on `crates/xchecker-runner/src/error.rs`'s `RunnerError`.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("executable '{name}' was not found on PATH ({searched})")]
    ExecutableNotFound { name: String, searched: String },

    #[error("command {argv:?} exited with status {code}")]
    NonZeroExitCode { argv: Vec<String>, code: i32 },

    #[error("command {argv:?} timed out after {timeout_seconds}s")]
    TimeoutExpired {
        argv: Vec<String>,
        timeout_seconds: u64,
    },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open stdout log file {path}: {source}")]
    StdoutLog {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("process monitoring thread terminated unexpectedly")]
    MonitorDisconnected,
}
