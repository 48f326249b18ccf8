use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flow results, persisted to `results.json` by the launcher (spec §4.8
/// step 13). Grounded on `flow.py`'s `Flow.Results`, a dict-like box with
/// `success`, `tools` and an open `artifacts` bag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowResults {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub artifacts: Map<String, Value>,
    /// Seconds the flow's `run()` took; set by the launcher, not the flow.
    #[serde(default)]
    pub runtime: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FlowResults {
    /// Merge parsed-report fields into the results bag. A `success` key is
    /// interpreted specially; everything else lands in `extra`. Mirrors
    /// `parse_report_regex`'s `self.results.update(**res)`.
    pub fn update(&mut self, fields: Map<String, Value>) {
        for (key, value) in fields {
            if key == "success" {
                if let Some(b) = value.as_bool() {
                    self.success = b;
                }
            } else {
                self.extra.insert(key, value);
            }
        }
    }
}
