//! Raw-data view: any JSON value as an indented textual tree.
//!
//! Object keys print in insertion order (serde_json's `preserve_order`
//! keeps that equal to the record's declaration order), one entry per
//! line, trailing comma on all but the last, closing delimiter back at
//! the parent's indent. Total over the whole value space; never panics.

use serde_json::Value;

/// Spaces per indent level.
const INDENT_WIDTH: usize = 2;

/// Render a value as an indented tree, rooted at indent level 0.
pub fn render(value: &Value) -> String {
    let mut out = String::new();
    render_value(value, 0, &mut out);
    out
}

fn render_value(value: &Value, indent: usize, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
        Value::Array(items) => render_array(items, indent, out),
        Value::Object(map) => render_object(map, indent, out),
    }
}

fn render_object(map: &serde_json::Map<String, Value>, indent: usize, out: &mut String) {
    if map.is_empty() {
        out.push_str("{}");
        return;
    }

    out.push('{');
    let last = map.len() - 1;
    for (index, (key, value)) in map.iter().enumerate() {
        out.push('\n');
        push_indent(indent + 1, out);
        out.push('"');
        out.push_str(key);
        out.push_str("\": ");
        render_value(value, indent + 1, out);
        if index < last {
            out.push(',');
        }
    }
    out.push('\n');
    push_indent(indent, out);
    out.push('}');
}

fn render_array(items: &[Value], indent: usize, out: &mut String) {
    if items.is_empty() {
        out.push_str("[]");
        return;
    }

    out.push('[');
    let last = items.len() - 1;
    for (index, value) in items.iter().enumerate() {
        out.push('\n');
        push_indent(indent + 1, out);
        render_value(value, indent + 1, out);
        if index < last {
            out.push(',');
        }
    }
    out.push('\n');
    push_indent(indent, out);
    out.push(']');
}

fn push_indent(level: usize, out: &mut String) {
    for _ in 0..level * INDENT_WIDTH {
        out.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::HealthRecord;
    use serde_json::json;

    // ── Scalars ──

    #[test]
    fn scalars_render_as_their_literal_form() {
        assert_eq!(render(&Value::Null), "null");
        assert_eq!(render(&json!(true)), "true");
        assert_eq!(render(&json!(false)), "false");
        assert_eq!(render(&json!(7)), "7");
        assert_eq!(render(&json!(2.5)), "2.5");
        assert_eq!(render(&json!("hello")), "\"hello\"");
    }

    // ── Containers ──

    #[test]
    fn empty_containers_stay_on_one_line() {
        assert_eq!(render(&json!({})), "{}");
        assert_eq!(render(&json!([])), "[]");
    }

    #[test]
    fn nested_array_under_a_key() {
        let rendered = render(&json!({"a": [1, "x", null]}));
        assert_eq!(
            rendered,
            "{\n  \"a\": [\n    1,\n    \"x\",\n    null\n  ]\n}"
        );
    }

    #[test]
    fn object_entries_get_trailing_commas_except_last() {
        let rendered = render(&json!({"first": 1, "second": 2}));
        assert_eq!(rendered, "{\n  \"first\": 1,\n  \"second\": 2\n}");
    }

    #[test]
    fn keys_render_in_insertion_order() {
        let rendered = render(&json!({"zebra": 1, "apple": 2, "mango": 3}));
        let zebra = rendered.find("zebra").unwrap();
        let apple = rendered.find("apple").unwrap();
        let mango = rendered.find("mango").unwrap();
        assert!(zebra < apple && apple < mango);
    }

    #[test]
    fn closing_delimiter_sits_at_the_parent_indent() {
        let rendered = render(&json!({"outer": {"inner": 1}}));
        assert_eq!(
            rendered,
            "{\n  \"outer\": {\n    \"inner\": 1\n  }\n}"
        );
    }

    #[test]
    fn empty_object_inside_an_array() {
        assert_eq!(render(&json!([{}])), "[\n  {}\n]");
    }

    // ── Round trip over records ──

    #[test]
    fn rendered_record_parses_back_to_the_same_structure() {
        let args = json!({
            "meals": [{
                "log_type": "meal",
                "title": "breakfast",
                "ingredients": ["toast", "eggs"],
                "pertains_to": "in the morning"
            }],
            "symptoms": [],
            "stress_levels": [],
            "stool_data": [],
            "medications": [],
            "sleep": {"log_type": "sleep", "score": null, "pertains_to": "last night"},
            "period_status": {"log_type": "period_status", "status": true}
        });
        let record = HealthRecord::from_tool_args(&args).unwrap().record;
        let value = serde_json::to_value(&record).unwrap();
        let rendered = render(&value);
        let reparsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(reparsed, value);
    }

    #[test]
    fn default_record_keys_appear_in_declaration_order() {
        let value = serde_json::to_value(HealthRecord::default()).unwrap();
        let rendered = render(&value);
        let positions: Vec<usize> = [
            "\"meals\"",
            "\"symptoms\"",
            "\"stress_levels\"",
            "\"stool_data\"",
            "\"medications\"",
            "\"sleep\"",
            "\"period_status\"",
        ]
        .iter()
        .map(|key| rendered.find(key).unwrap())
        .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn absent_sleep_score_renders_as_null() {
        let value = serde_json::to_value(HealthRecord::default()).unwrap();
        let rendered = render(&value);
        assert!(rendered.contains("\"score\": null"));
    }
}
