use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::ui;

pub mod table;

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Table => render_table(value),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

fn render_table<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let width = ui::prefs().term_width;
    match serde_json::to_value(value)? {
        Value::Array(items) => Ok(render_array_table(&items, width)),
        Value::Object(map) => {
            // Nested objects flatten to dotted keys so summaries stay readable.
            let mut rows = Vec::new();
            flatten("", &Value::Object(map), &mut rows);
            Ok(table::render_table(&["key", "value"], &rows, width))
        }
        scalar => Ok(table::render_table(&["value"], &[vec![value_to_cell(&scalar)]], width)),
    }
}

fn flatten(prefix: &str, value: &Value, rows: &mut Vec<Vec<String>>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, value) in map {
                let key = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
                flatten(&key, value, rows);
            }
        }
        other => rows.push(vec![prefix.to_string(), value_to_cell(other)]),
    }
}

fn render_array_table(items: &[Value], width: Option<usize>) -> String {
    if items.is_empty() {
        return String::from("(no rows)");
    }
    if !items.iter().all(Value::is_object) {
        let rows: Vec<Vec<String>> = items.iter().map(|item| vec![value_to_cell(item)]).collect();
        return table::render_table(&["value"], &rows, width);
    }

    let mut headers = Vec::<String>::new();
    for map in items.iter().filter_map(Value::as_object) {
        for key in map.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    let rows: Vec<Vec<String>> = items
        .iter()
        .filter_map(Value::as_object)
        .map(|map| {
            headers
                .iter()
                .map(|header| map.get(header).map_or_else(|| String::from("-"), value_to_cell))
                .collect()
        })
        .collect();
    table::render_table(&header_refs, &rows, width)
}

fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("-"),
        Value::Bool(v) => v.to_string(),
        Value::Number(v) => v.to_string(),
        Value::String(v) => v.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| String::from("<invalid-json>")),
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::render;
    use crate::cli::OutputFormat;

    #[derive(Serialize)]
    struct Counts {
        processed: u32,
        deferred: u32,
    }

    #[derive(Serialize)]
    struct Summary {
        pmid: &'static str,
        counts: Counts,
    }

    fn summary() -> Summary {
        Summary {
            pmid: "31",
            counts: Counts {
                processed: 7,
                deferred: 2,
            },
        }
    }

    #[test]
    fn raw_render_is_single_line_json() {
        let out = render(&summary(), OutputFormat::Raw).expect("raw render should work");
        let parsed: serde_json::Value = serde_json::from_str(&out).expect("json should parse");
        assert_eq!(parsed["counts"]["processed"], 7);
        assert!(!out.contains('\n'));
    }

    #[test]
    fn table_render_flattens_nested_objects() {
        let out = render(&summary(), OutputFormat::Table).expect("table render should work");
        assert!(out.lines().next().is_some_and(|line| line.starts_with("key")));
        assert!(out.contains("counts.processed"));
        assert!(out.contains("counts.deferred"));
    }

    #[test]
    fn empty_array_renders_placeholder() {
        let out = render(&Vec::<Counts>::new(), OutputFormat::Table).expect("table render should work");
        assert_eq!(out, "(no rows)");
    }
}
