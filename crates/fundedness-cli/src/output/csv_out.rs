use serde_json::Value;
use std::io;

use super::object_rows;

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Results with a row-shaped field (strategy metrics, asset details) are
/// written as that table; percentile bands are written one row per year;
/// anything else becomes field/value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => {
            if let Some(rows) = ["metrics", "asset_details"]
                .iter()
                .find_map(|k| map.get(*k).and_then(object_rows))
            {
                write_rows(&mut wtr, rows);
            } else if let Some(Value::Object(bands)) = map.get("wealth_percentiles") {
                write_bands(&mut wtr, bands);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        }
        Value::Array(arr) => write_rows(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(result)]);
        }
    }

    let _ = wtr.flush();
}

fn write_rows(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let _ = wtr.write_record(&headers);
    for map in arr.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&row);
    }
}

/// `year,P10,P25,...` with one row per simulated year.
fn write_bands(wtr: &mut StdoutWriter<'_>, bands: &serde_json::Map<String, Value>) {
    let columns: Vec<(&String, &Vec<Value>)> = bands
        .iter()
        .filter_map(|(k, v)| v.as_array().map(|a| (k, a)))
        .collect();
    let n_years = columns.iter().map(|(_, a)| a.len()).max().unwrap_or(0);

    let mut header = vec!["year".to_string()];
    header.extend(columns.iter().map(|(k, _)| k.to_string()));
    let _ = wtr.write_record(&header);

    for year in 0..n_years {
        let mut row = vec![(year + 1).to_string()];
        row.extend(
            columns
                .iter()
                .map(|(_, a)| a.get(year).map(format_csv_value).unwrap_or_default()),
        );
        let _ = wtr.write_record(&row);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
