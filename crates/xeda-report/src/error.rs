use thiserror::Error;

/// Errors from report parsing (spec §4.6, §7 `ReportParseMissing`).
#[derive(Debug, Error)]
pub enum ReportParseError {
    #[error("report file not found: {0}")]
    ReportMissing(String),

    #[error("required pattern group #{index} matched nothing in {report}")]
    ReportParseMissing { report: String, index: usize },

    #[error("failed to read report {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("malformed XML in {path}: {source}")]
    Xml {
        path: String,
        #[source]
        source: roxmltree::Error,
    },
}
