use serde_json::Value;

/// The five override sources for a flow's settings, lowest to highest
/// precedence (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SettingsSource {
    FlowDefaults,
    XedaProjectTable,
    DesignEmbedded,
    ExplicitOverrides,
    CliFlowSettings,
}

impl SettingsSource {
    /// All sources in ascending precedence order.
    pub const ORDER: [SettingsSource; 5] = [
        SettingsSource::FlowDefaults,
        SettingsSource::XedaProjectTable,
        SettingsSource::DesignEmbedded,
        SettingsSource::ExplicitOverrides,
        SettingsSource::CliFlowSettings,
    ];
}

/// Deep-merge `patch` onto `base`: objects merge key-by-key recursively,
/// any other value (including arrays) in `patch` replaces the
/// corresponding value in `base` wholesale.
pub fn deep_merge(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (k, v) in patch_map {
                deep_merge(base_map.entry(k.clone()).or_insert(Value::Null), v);
            }
        }
        (base_slot, patch_value) => {
            *base_slot = patch_value.clone();
        }
    }
}

/// Merge a sequence of `(source, layer)` pairs in increasing precedence
/// order, where `layer` is `None` when that source contributed nothing.
/// Later layers win conflicts; layers are applied in the caller's given
/// order, so callers must pass them already sorted by [`SettingsSource`].
pub fn merge_layers<'a>(layers: impl IntoIterator<Item = &'a Value>) -> Value {
    let mut merged = Value::Object(serde_json::Map::new());
    for layer in layers {
        deep_merge(&mut merged, layer);
    }
    merged
}
