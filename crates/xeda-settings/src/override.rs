use crate::error::OverrideParseError;
use camino::Utf8PathBuf;
use serde_json::{Map, Value};

/// A single parsed `--flow-settings` entry: a dotted key path plus its
/// coerced value (spec §4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub path: Vec<String>,
    pub value: Value,
}

/// Parse one `key=value` string into an [`Override`], coercing `value`
/// per the rules in spec §4.3: integer-like, then float-like, then the
/// booleans `{true,yes,false,no}`, then a bracket-list literal
/// `[a,b,c]`, else string. `{file = "..."}` resolves to an absolute
/// path string.
pub fn parse_override(raw: &str) -> Result<Override, OverrideParseError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| OverrideParseError::MissingEquals(raw.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(OverrideParseError::EmptyKey(raw.to_string()));
    }
    let path = key.split('.').map(str::to_string).collect();
    let value = coerce(value.trim());
    Ok(Override { path, value })
}

/// Coerce a single override's raw string form into a JSON value.
pub fn coerce(raw: &str) -> Value {
    if let Some(path) = parse_file_literal(raw) {
        return Value::String(path);
    }
    if let Some(inner) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let items = split_top_level(inner)
            .into_iter()
            .map(|item| coerce(item.trim()))
            .collect();
        return Value::Array(items);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return Value::Number(n);
            }
        }
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" => return Value::Bool(true),
        "false" | "no" => return Value::Bool(false),
        _ => {}
    }
    Value::String(raw.to_string())
}

fn parse_file_literal(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('{')?.strip_suffix('}')?;
    let inner = inner.trim();
    let rest = inner.strip_prefix("file")?.trim_start();
    let rest = rest.strip_prefix('=')?.trim();
    let quoted = rest.strip_prefix('"')?.strip_suffix('"')?;
    let path = Utf8PathBuf::from(quoted);
    let absolute = if path.is_absolute() {
        path
    } else {
        let cwd = std::env::current_dir().ok()?;
        Utf8PathBuf::from_path_buf(cwd).ok()?.join(path)
    };
    Some(absolute.to_string())
}

/// Split a bracket-list's interior on top-level commas (ignoring commas
/// nested inside `[...]` or `{...}`).
fn split_top_level(s: &str) -> Vec<&str> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' | '{' => depth += 1,
            ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Apply a single override onto a mutable JSON object tree, creating
/// intermediate objects as needed along the dotted path.
pub fn apply_override(root: &mut Value, ovr: &Override) {
    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
    let mut current = root;
    let (last, init) = match ovr.path.split_last() {
        Some(split) => split,
        None => return,
    };
    for segment in init {
        let obj = current.as_object_mut().expect("root coerced to object above");
        current = obj
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
    }
    let obj = current.as_object_mut().expect("walked to an object node");
    obj.insert(last.clone(), ovr.value.clone());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_integers() {
        assert_eq!(coerce("42"), Value::from(42));
        assert_eq!(coerce("-7"), Value::from(-7));
    }

    #[test]
    fn coerces_floats() {
        assert_eq!(coerce("3.14"), Value::from(3.14));
    }

    #[test]
    fn coerces_booleans_case_insensitively() {
        assert_eq!(coerce("true"), Value::Bool(true));
        assert_eq!(coerce("Yes"), Value::Bool(true));
        assert_eq!(coerce("FALSE"), Value::Bool(false));
        assert_eq!(coerce("no"), Value::Bool(false));
    }

    #[test]
    fn coerces_bracket_lists() {
        assert_eq!(
            coerce("[a,b,c]"),
            Value::Array(vec![
                Value::String("a".into()),
                Value::String("b".into()),
                Value::String("c".into()),
            ])
        );
    }

    #[test]
    fn coerces_nested_bracket_lists() {
        assert_eq!(
            coerce("[1,[2,3]]"),
            Value::Array(vec![
                Value::from(1),
                Value::Array(vec![Value::from(2), Value::from(3)]),
            ])
        );
    }

    #[test]
    fn falls_back_to_string() {
        assert_eq!(coerce("Performance_Explore"), Value::String("Performance_Explore".into()));
    }

    #[test]
    fn parses_dotted_key() {
        let ovr = parse_override("impl.strategy=Performance_Explore").unwrap();
        assert_eq!(ovr.path, vec!["impl".to_string(), "strategy".to_string()]);
        assert_eq!(ovr.value, Value::String("Performance_Explore".into()));
    }

    #[test]
    fn rejects_missing_equals() {
        assert!(parse_override("no-equals-sign").is_err());
    }

    #[test]
    fn apply_override_builds_nested_maps() {
        let mut root = Value::Object(Map::new());
        let ovr = parse_override("impl.strategy=Performance_Explore").unwrap();
        apply_override(&mut root, &ovr);
        assert_eq!(root["impl"]["strategy"], Value::String("Performance_Explore".into()));
    }

    #[test]
    fn resolves_file_literal_to_absolute_path() {
        let ovr = parse_override("constraints={file = \"foo.xdc\"}").unwrap();
        let Value::String(s) = &ovr.value else {
            panic!("expected string");
        };
        assert!(Utf8PathBuf::from(s.as_str()).is_absolute());
        assert!(s.ends_with("foo.xdc"));
    }
}
