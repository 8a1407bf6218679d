use serde_json::Value;

/// Headline fields, most specific first.
const PRIORITY_KEYS: [&str; 5] = [
    "cefr",
    "success_rate",
    "liability_pv",
    "median_terminal_wealth",
    "strategy_names",
];

/// Print just the headline answer from the output envelope.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        let headline = PRIORITY_KEYS
            .iter()
            .find_map(|key| map.get(*key).filter(|v| !v.is_null()));
        if let Some(val) = headline {
            println!("{}", format_minimal(val));
            return;
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{key}: {}", format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        // FundedRatio serialises as {"finite": "1.23"} or "unbounded".
        Value::Object(map) if map.len() == 1 => map
            .values()
            .next()
            .map(format_minimal)
            .unwrap_or_default(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
