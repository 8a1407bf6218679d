use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::object_rows;

/// Longest numeric array shown inline; longer ones are summarised.
const INLINE_ARRAY_LIMIT: usize = 8;

/// Format output as tables: scalar fields first, then one table per
/// array-of-objects field.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_result_table(result, map),
            None => print_object(map),
        },
        Value::Array(arr) => print_rows(arr),
        _ => println!("{value}"),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => {
            print_object(res_map);
            for (key, val) in res_map {
                if let Some(rows) = object_rows(val) {
                    println!("\n{key}:");
                    print_rows(rows);
                }
            }
        }
        _ => print_object(envelope),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

fn print_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map.iter().filter(|(_, v)| object_rows(v).is_none()) {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            println!("{}", format_value(item));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for map in arr.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
            .collect();
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) if arr.len() > INLINE_ARRAY_LIMIT => summarise_array(arr),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}: {}", format_value(v)))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

/// First and last element of a long series, e.g. a percentile band.
fn summarise_array(arr: &[Value]) -> String {
    let first = arr.first().map(format_value).unwrap_or_default();
    let last = arr.last().map(format_value).unwrap_or_default();
    format!("[{} values] {first} .. {last}", arr.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_long_series_is_summarised() {
        let v = json!([1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(format_value(&v), "[10 values] 1 .. 10");
        assert_eq!(format_value(&json!([1, 2])), "1, 2");
    }

    #[test]
    fn test_nested_object_flattened() {
        let v = json!({"P10": [1], "P50": [2]});
        assert_eq!(format_value(&v), "P10: 1; P50: 2");
    }
}
