use crate::error::ReportParseError;
use regex::Regex;
use serde_json::{Map, Value};

/// One position in the ordered pattern list: a set of alternative regexes
/// ("try each until one matches"), each compiled with the sweep's DOTALL
/// setting.
#[derive(Debug, Clone)]
pub struct PatternGroup {
    pub alternatives: Vec<String>,
}

impl PatternGroup {
    pub fn single(pattern: impl Into<String>) -> Self {
        Self {
            alternatives: vec![pattern.into()],
        }
    }

    pub fn one_of(alternatives: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            alternatives: alternatives.into_iter().map(Into::into).collect(),
        }
    }
}

/// Configuration for one regex-sweep pass over a report (spec §4.6).
pub struct RegexSweepConfig {
    pub patterns: Vec<PatternGroup>,
    /// After a pattern group matches, drop the consumed prefix so the
    /// next group only searches the remainder.
    pub sequential: bool,
    /// If a pattern group matches nothing, the whole sweep fails.
    pub required: bool,
    pub dotall: bool,
}

/// Coerce a captured string per spec §4.6: int, then float, then bool,
/// else string.
fn coerce(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    Value::String(raw.to_string())
}

fn compile(pattern: &str, dotall: bool) -> Result<Regex, ReportParseError> {
    let source = if dotall {
        format!("(?s){pattern}")
    } else {
        pattern.to_string()
    };
    Regex::new(&source).map_err(|source| ReportParseError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

/// Sweep `text` with `config`'s ordered pattern groups, returning named
/// capture groups coerced to JSON values, merged across all groups.
///
/// Grounded on `original_source/src/xeda/flow/flow.py`'s
/// `parse_regex`/`parse_report_regex`.
pub fn sweep(
    report_name: &str,
    text: &str,
    config: &RegexSweepConfig,
) -> Result<Map<String, Value>, ReportParseError> {
    let mut results = Map::new();
    let mut cursor = 0usize;

    for (index, group) in config.patterns.iter().enumerate() {
        let search_space = if config.sequential { &text[cursor..] } else { text };
        let mut matched = false;
        for pattern in &group.alternatives {
            let re = compile(pattern, config.dotall)?;
            if let Some(caps) = re.captures(search_space) {
                for name in re.capture_names().flatten() {
                    if let Some(value) = caps.name(name) {
                        results.insert(name.to_string(), coerce(value.as_str()));
                    }
                }
                if config.sequential {
                    let whole = caps.get(0).expect("capture 0 always present");
                    cursor += whole.end();
                }
                matched = true;
                break;
            }
        }
        if !matched && config.required {
            tracing::warn!(report = report_name, index, "required pattern group did not match");
            return Err(ReportParseError::ReportParseMissing {
                report: report_name.to_string(),
                index,
            });
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_named_capture_groups_with_coercion() {
        let text = "WNS: 0.523\nFrequency: 412.5MHz\nSuccess: true";
        let config = RegexSweepConfig {
            patterns: vec![
                PatternGroup::single(r"WNS:\s*(?P<wns>-?[0-9.]+)"),
                PatternGroup::single(r"Success:\s*(?P<success>true|false)"),
            ],
            sequential: false,
            required: true,
            dotall: false,
        };
        let results = sweep("timing.rpt", text, &config).unwrap();
        assert_eq!(results["wns"], Value::from(0.523));
        assert_eq!(results["success"], Value::Bool(true));
    }

    #[test]
    fn sequential_mode_consumes_prefix_between_groups() {
        let text = "Section A\nvalue=1\nSection B\nvalue=2\n";
        let config = RegexSweepConfig {
            patterns: vec![
                PatternGroup::single(r"Section A\nvalue=(?P<a>\d+)"),
                PatternGroup::single(r"Section B\nvalue=(?P<b>\d+)"),
            ],
            sequential: true,
            required: true,
            dotall: false,
        };
        let results = sweep("sections.rpt", text, &config).unwrap();
        assert_eq!(results["a"], Value::from(1));
        assert_eq!(results["b"], Value::from(2));
    }

    #[test]
    fn tries_alternatives_in_order() {
        let text = "Fmax = 250 MHz";
        let config = RegexSweepConfig {
            patterns: vec![PatternGroup::one_of([
                r"Frequency:\s*(?P<fmax>[0-9.]+)",
                r"Fmax\s*=\s*(?P<fmax>[0-9.]+)",
            ])],
            sequential: false,
            required: true,
            dotall: false,
        };
        let results = sweep("fmax.rpt", text, &config).unwrap();
        assert_eq!(results["fmax"], Value::from(250));
    }

    #[test]
    fn required_group_with_no_match_is_an_error() {
        let config = RegexSweepConfig {
            patterns: vec![PatternGroup::single(r"NotPresent:(?P<x>\d+)")],
            sequential: false,
            required: true,
            dotall: false,
        };
        let err = sweep("report.rpt", "nothing relevant here", &config).unwrap_err();
        assert!(matches!(err, ReportParseError::ReportParseMissing { .. }));
    }

    #[test]
    fn optional_group_with_no_match_is_tolerated() {
        let config = RegexSweepConfig {
            patterns: vec![PatternGroup::single(r"NotPresent:(?P<x>\d+)")],
            sequential: false,
            required: false,
            dotall: false,
        };
        let results = sweep("report.rpt", "nothing relevant here", &config).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn dotall_lets_pattern_span_newlines() {
        let text = "Start\nmiddle\nEnd: (?P<x>42)".replace("(?P<x>42)", "42");
        let config = RegexSweepConfig {
            patterns: vec![PatternGroup::single(r"Start(?P<body>.*)End: (?P<x>\d+)")],
            sequential: false,
            required: true,
            dotall: true,
        };
        let results = sweep("multiline.rpt", &text, &config).unwrap();
        assert_eq!(results["x"], Value::from(42));
    }
}
