use camino::Utf8PathBuf;

/// Errors surfaced at the CLI boundary itself (argument/file handling),
/// layered on top of the engine's own error types. Grounded on
/// `src/exit_codes.rs`'s `XCheckerError` aggregation pattern.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("io error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported design file extension '{0}' (expected toml, json, yaml or yml)")]
    UnsupportedExtension(String),

    #[error("failed to parse {path} as {format}: {source}")]
    Parse {
        path: Utf8PathBuf,
        format: &'static str,
        source: String,
    },

    #[error("xedaproject at {0} declares no designs")]
    NoDesignsDeclared(Utf8PathBuf),

    #[error("exactly one of --design or --xedaproject must be given")]
    MissingDesignSource,

    #[error("xedaproject declares more than one design; pass --design-name to pick one of: {}", available.join(", "))]
    AmbiguousDesign { available: Vec<String> },

    #[error("no design named '{name}' in xedaproject; available designs: {}", available.join(", "))]
    UnknownDesign { name: String, available: Vec<String> },

    #[error(transparent)]
    Override(#[from] xeda_settings::OverrideParseError),

    #[error(transparent)]
    Engine(#[from] xeda_engine::EngineError),

    #[error(transparent)]
    Dse(#[from] xeda_dse::DseError),

    #[error(transparent)]
    RunPath(#[from] xeda_runpath::RunPathError),
}
