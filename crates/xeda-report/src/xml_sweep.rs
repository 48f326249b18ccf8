use crate::error::ReportParseError;
use serde_json::{Map, Value};

/// Parse `xml_text` as a sequence of `section/table` blocks into a nested
/// map: outer keys are section titles, inner maps are keyed by each row's
/// first column, with values keyed by the remaining column headers (spec
/// §4.6 XML sweep). Text is HTML-unescaped and stripped.
pub fn sweep(path_hint: &str, xml_text: &str) -> Result<Map<String, Value>, ReportParseError> {
    let doc = roxmltree::Document::parse(xml_text).map_err(|source| ReportParseError::Xml {
        path: path_hint.to_string(),
        source,
    })?;

    let mut outer = Map::new();
    for section in doc.descendants().filter(|n| n.has_tag_name("section")) {
        let title = section
            .attribute("title")
            .or_else(|| section.attribute("name"))
            .unwrap_or("section")
            .to_string();

        let mut section_map = Map::new();
        for table in section.children().filter(|n| n.has_tag_name("table")) {
            for parsed_table in parse_table(table) {
                for (key, row) in parsed_table {
                    section_map.insert(key, Value::Object(row));
                }
            }
        }
        outer.insert(title, Value::Object(section_map));
    }
    Ok(outer)
}

fn parse_table(table: roxmltree::Node) -> Option<Vec<(String, Map<String, Value>)>> {
    let mut headers: Vec<String> = Vec::new();
    let mut rows = Vec::new();

    for row_node in table.children().filter(|n| n.has_tag_name("tr")) {
        let cells: Vec<String> = row_node
            .children()
            .filter(|n| n.has_tag_name("td") || n.has_tag_name("th"))
            .map(clean_text)
            .collect();
        if cells.is_empty() {
            continue;
        }
        if headers.is_empty() && row_node.children().any(|n| n.has_tag_name("th")) {
            headers = cells;
            continue;
        }
        if headers.is_empty() {
            headers = (0..cells.len()).map(|i| format!("col{i}")).collect();
        }
        let (key, rest) = cells.split_first().unwrap();
        let mut row_map = Map::new();
        for (header, value) in headers.iter().skip(1).zip(rest) {
            row_map.insert(header.clone(), Value::String(value.clone()));
        }
        rows.push((key.clone(), row_map));
    }
    Some(rows)
}

fn clean_text(node: roxmltree::Node) -> String {
    let raw: String = node.descendants().filter_map(|n| n.text()).collect();
    unescape_html(raw.trim())
}

/// Decode the handful of HTML/XML entities that show up in EDA tool
/// report tables (roxmltree already unescapes XML's five predefined
/// entities in element text, so this only needs to catch entities a
/// report author embedded literally, e.g. `&nbsp;`).
fn unescape_html(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_section_table_rows_keyed_by_first_column() {
        let xml = r#"
        <report>
          <section title="Utilization">
            <table>
              <tr><th>Resource</th><th>Used</th><th>Available</th></tr>
              <tr><td>LUT</td><td>1024</td><td>20800</td></tr>
              <tr><td>FF</td><td>512</td><td>41600</td></tr>
            </table>
          </section>
        </report>
        "#;
        let result = sweep("util.xml", xml).unwrap();
        let util = result["Utilization"].as_object().unwrap();
        assert_eq!(util["LUT"]["Used"], Value::String("1024".to_string()));
        assert_eq!(util["FF"]["Available"], Value::String("41600".to_string()));
    }

    #[test]
    fn html_unescapes_cell_text() {
        let xml = r#"
        <report>
          <section title="Timing">
            <table>
              <tr><th>Path</th><th>Slack</th></tr>
              <tr><td>clk-&gt;q</td><td>0.125</td></tr>
            </table>
          </section>
        </report>
        "#;
        let result = sweep("timing.xml", xml).unwrap();
        let timing = result["Timing"].as_object().unwrap();
        assert!(timing.contains_key("clk->q"));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(sweep("bad.xml", "<not valid xml").is_err());
    }
}
