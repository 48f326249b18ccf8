use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use xeda_flow::FlowResults;

/// The result of launching one candidate flow (spec §4.9's `FlowOutcome`).
///
/// Kept even when `results.success` is false: a failing run can still
/// carry a useful partial metric (e.g. an Fmax implied by negative slack)
/// that an optimizer wants to see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowOutcome {
    pub settings_snapshot: Value,
    pub results: FlowResults,
    pub timestamp: Option<String>,
    pub run_path: Option<Utf8PathBuf>,
}

impl FlowOutcome {
    /// Convenience accessor mirroring `outcome.results.get(key)` in the
    /// original: looks first at named fields, then at the `extra` bag.
    pub fn result_value(&self, key: &str) -> Option<&Value> {
        match key {
            "success" => None,
            "runtime" => None,
            _ => self
                .results
                .extra
                .get(key)
                .or_else(|| self.results.artifacts.get(key)),
        }
    }

    pub fn result_f64(&self, key: &str) -> Option<f64> {
        self.result_value(key).and_then(Value::as_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_value_reads_extra_bag() {
        let mut results = FlowResults::default();
        results.extra.insert("Fmax".into(), json!(250.5));
        let outcome = FlowOutcome {
            settings_snapshot: json!({}),
            results,
            timestamp: None,
            run_path: None,
        };
        assert_eq!(outcome.result_f64("Fmax"), Some(250.5));
        assert_eq!(outcome.result_f64("missing"), None);
    }
}
