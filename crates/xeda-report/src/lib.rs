//! Report extraction into a flow's results map (spec §4.6).
//!
//! Grounded on `original_source/src/xeda/flow/flow.py`'s
//! `parse_regex`/`parse_report_regex`.

mod error;
mod regex_sweep;
mod xml_sweep;

pub use error::ReportParseError;
pub use regex_sweep::{sweep as regex_sweep, PatternGroup, RegexSweepConfig};
pub use xml_sweep::sweep as xml_sweep;

use camino::Utf8Path;

/// Read `path` and run a regex sweep over its contents. A missing report
/// file is a warning, not an error (spec §4.6): returns an empty map.
pub fn regex_sweep_file(
    path: &Utf8Path,
    config: &RegexSweepConfig,
) -> Result<serde_json::Map<String, serde_json::Value>, ReportParseError> {
    if !path.exists() {
        tracing::warn!(report = %path, "report file missing, skipping regex sweep");
        return Ok(serde_json::Map::new());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ReportParseError::Io {
        path: path.to_string(),
        source,
    })?;
    regex_sweep(path.as_str(), &text, config)
}

/// Read `path` and run an XML sweep over its contents, same missing-file
/// tolerance as [`regex_sweep_file`].
pub fn xml_sweep_file(
    path: &Utf8Path,
) -> Result<serde_json::Map<String, serde_json::Value>, ReportParseError> {
    if !path.exists() {
        tracing::warn!(report = %path, "report file missing, skipping xml sweep");
        return Ok(serde_json::Map::new());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ReportParseError::Io {
        path: path.to_string(),
        source,
    })?;
    xml_sweep(path.as_str(), &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_report_file_is_tolerated() {
        let path = Utf8Path::new("/nonexistent/report.rpt");
        let config = RegexSweepConfig {
            patterns: vec![],
            sequential: false,
            required: false,
            dotall: false,
        };
        let result = regex_sweep_file(path, &config).unwrap();
        assert!(result.is_empty());
    }
}
