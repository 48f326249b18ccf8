//! Layered settings overrides: parsing `key=value` strings, merging
//! override layers by precedence, and accumulating validation errors.
//!
//! Grounded on `original_source/src/xeda/flow/flow.py` (`FlowSettingsError`,
//! the dotted-path/coercion rules implied by `XedaBaseModel` field
//! validators) and on `crates/xchecker-config/src/config/builder.rs` for
//! the layered-override idiom (a builder assembling values from multiple
//! sources with source attribution).

mod error;
mod merge;
mod r#override;

pub use error::{OverrideParseError, SettingsErrorEntry, SettingsValidationError};
pub use merge::{deep_merge, merge_layers, SettingsSource};
pub use r#override::{apply_override, coerce, parse_override, Override};

use serde_json::Value;

/// Parse and apply a whole `--flow-settings` list (or any other source's
/// list of `key=value` strings) onto a JSON object in order.
pub fn apply_overrides<'a>(
    root: &mut Value,
    raw: impl IntoIterator<Item = &'a str>,
) -> Result<(), OverrideParseError> {
    for entry in raw {
        let ovr = parse_override(entry)?;
        apply_override(root, &ovr);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn apply_overrides_processes_list_in_order() {
        let mut root = json!({});
        apply_overrides(
            &mut root,
            ["impl.strategy=Performance_Explore", "nthreads=4", "clean=true"],
        )
        .unwrap();
        assert_eq!(
            root,
            json!({
                "impl": {"strategy": "Performance_Explore"},
                "nthreads": 4,
                "clean": true,
            })
        );
    }
}
