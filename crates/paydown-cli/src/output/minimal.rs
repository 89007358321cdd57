use serde_json::Value;

/// Headline fields in order of priority, searched in the result and its summary.
const PRIORITY_KEYS: [&str; 6] = [
    "worst_scenario",
    "risk_level",
    "all_passing",
    "ranking",
    "exit_leverage",
    "exit_debt",
];

/// Print just the headline answer from the output.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    // Comparison: one line per case
    if let Some(Value::Array(cases)) = result_obj.get("cases") {
        for case in cases {
            println!(
                "{}: {}",
                case.get("name").map(format_minimal).unwrap_or_default(),
                case.get("exit_leverage").map(format_minimal).unwrap_or_default()
            );
        }
        return;
    }

    let summary = result_obj.get("summary");
    for key in &PRIORITY_KEYS {
        let found = result_obj
            .get(*key)
            .or_else(|| summary.and_then(|s| s.get(*key)));
        if let Some(val) = found {
            if !val.is_null() {
                println!("{}", format_minimal(val));
                return;
            }
        }
    }

    if let Value::Object(map) = result_obj {
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
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
        Value::Array(arr) => arr.iter().map(format_minimal).collect::<Vec<_>>().join(" > "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
