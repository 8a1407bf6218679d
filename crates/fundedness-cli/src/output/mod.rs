pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Rows of a result field that holds an array of objects, such as
/// per-asset details or per-strategy metrics.
pub(crate) fn object_rows(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(arr) if !arr.is_empty() && arr.iter().all(Value::is_object) => {
            Some(arr.as_slice())
        }
        _ => None,
    }
}
