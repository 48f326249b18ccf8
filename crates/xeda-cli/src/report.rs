//! Human-readable results table printed after a flow run completes.
//!
//! Grounded on `default_runner.py::print_results`'s two-column table: a
//! bold key column, a right-justified value column, `Status` highlighted
//! green/red, `runtime` rendered as `H:MM:SS`, nested dict-valued fields
//! expanded into indented sub-rows, and a skip-list of internal
//! bookkeeping fields. Rendered with hand-written box-drawing characters
//! and raw ANSI escapes rather than pulling in a terminal-UI crate.

use serde_json::{Map, Value};
use xeda_flow::FlowResults;

const SKIP_FIELDS: &[&str] = &["timestamp", "design", "flow", "tools", "run_path", "artifacts"];

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

struct Row {
    key: String,
    plain: String,
    display: String,
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.round() as i64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

fn format_scalar(value: &Value) -> String {
    match value {
        Value::Number(n) if n.is_f64() => format!("{:.3}", n.as_f64().unwrap_or_default()),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_rows(rows: &mut Vec<Row>, key: &str, value: &Value) {
    if let Value::Object(nested) = value {
        rows.push(Row {
            key: format!("{key}:"),
            plain: String::new(),
            display: String::new(),
        });
        for (nested_key, nested_value) in nested {
            let plain = format_scalar(nested_value);
            rows.push(Row {
                key: format!(" {nested_key}"),
                plain: plain.clone(),
                display: plain,
            });
        }
        return;
    }
    let plain = format_scalar(value);
    rows.push(Row { key: key.to_string(), plain: plain.clone(), display: plain });
}

fn results_rows(results: &FlowResults) -> Vec<Row> {
    let mut rows = Vec::new();
    rows.push(Row {
        key: "Status".to_string(),
        plain: if results.success { "OK".to_string() } else { "FAILED".to_string() },
        display: if results.success {
            format!("{GREEN}OK{RESET}")
        } else {
            format!("{RED}FAILED{RESET}")
        },
    });
    if let Some(runtime) = results.runtime {
        let text = format_duration(runtime);
        rows.push(Row { key: "Run time".to_string(), plain: text.clone(), display: format!("{DIM}{text}{RESET}") });
    }
    for (key, value) in extra_fields(&results.extra) {
        push_rows(&mut rows, key, value);
    }
    rows
}

fn extra_fields(extra: &Map<String, Value>) -> impl Iterator<Item = (&String, &Value)> {
    extra
        .iter()
        .filter(|(key, _)| !key.starts_with('_') && !SKIP_FIELDS.contains(&key.as_str()))
}

/// Render `results` as a compact boxed table titled `title` (typically
/// `"<flow> <design>"`).
///
/// Column widths are computed from plain (ANSI-free) text so that the
/// color codes wrapped around `Status`'s value don't throw off alignment;
/// a row's visible span (key field + separator + value field) must equal
/// `inner_width`, which is also what the title row and borders are sized
/// to, or the box edges would drift out of alignment with the rows.
pub fn render_results_table(title: &str, results: &FlowResults) -> String {
    let rows = results_rows(results);

    let key_width = rows.iter().map(|r| r.key.chars().count()).max().unwrap_or(0);
    let value_width = rows.iter().map(|r| r.plain.chars().count()).max().unwrap_or(0);
    let inner_width = (key_width + 1 + value_width).max(title.chars().count());

    let mut out = String::new();
    out.push_str(&format!("╭{}╮\n", "─".repeat(inner_width + 2)));
    out.push_str(&format!("│ {BOLD}{title:<inner_width$}{RESET} │\n"));
    out.push_str(&format!("├{}┤\n", "─".repeat(inner_width + 2)));
    for row in &rows {
        let key_pad = " ".repeat(key_width.saturating_sub(row.key.chars().count()));
        let value_pad = " ".repeat(value_width.saturating_sub(row.plain.chars().count()));
        let filler = " ".repeat(inner_width.saturating_sub(key_width + 1 + value_width));
        out.push_str(&format!(
            "│ {BOLD}{key}{key_pad}{RESET} {value_pad}{value}{filler} │\n",
            key = row.key,
            value = row.display,
        ));
    }
    out.push_str(&format!("╰{}╯", "─".repeat(inner_width + 2)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_renders_green_status() {
        let results = FlowResults { success: true, ..FlowResults::default() };
        let table = render_results_table("my_flow top", &results);
        assert!(table.contains(&format!("{GREEN}OK{RESET}")));
    }

    #[test]
    fn failure_renders_red_status() {
        let results = FlowResults { success: false, ..FlowResults::default() };
        let table = render_results_table("my_flow top", &results);
        assert!(table.contains(&format!("{RED}FAILED{RESET}")));
    }

    #[test]
    fn bookkeeping_fields_are_skipped() {
        let mut results = FlowResults { success: true, ..FlowResults::default() };
        results.extra.insert("timestamp".to_string(), json!("2026-01-01"));
        results.extra.insert("Fmax".to_string(), json!(250.5));
        let table = render_results_table("my_flow top", &results);
        assert!(!table.contains("2026-01-01"));
        assert!(table.contains("250.500"));
    }

    #[test]
    fn runtime_is_rendered_as_hms() {
        let results = FlowResults { success: true, runtime: Some(83.0), ..FlowResults::default() };
        let table = render_results_table("my_flow top", &results);
        assert!(table.contains("0:01:23"));
    }

    #[test]
    fn nested_object_fields_expand_into_sub_rows() {
        let mut results = FlowResults { success: true, ..FlowResults::default() };
        results.extra.insert("timing".to_string(), json!({"wns": -0.2}));
        let table = render_results_table("my_flow top", &results);
        assert!(table.contains("timing:"));
        assert!(table.contains("wns"));
        assert!(table.contains("-0.2"));
    }
}
