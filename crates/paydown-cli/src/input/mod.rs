pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Load the request document from `--input`, falling back to piped stdin.
pub fn read_request(path: Option<&str>, command: &str) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        debug!(command, path, "reading request file");
        file::read_value(path)
    } else if let Some(data) = stdin::read_stdin()? {
        debug!(command, "read request from stdin");
        Ok(data)
    } else {
        Err(format!("--input <file.json|file.yaml> or stdin required for {command}").into())
    }
}

/// A request is either a bare assumptions document or a full input
/// envelope carrying an `assumptions` key plus analysis settings.
pub fn is_envelope(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|m| m.contains_key("assumptions"))
}

pub fn parse<T: DeserializeOwned>(value: Value) -> Result<T, Box<dyn std::error::Error>> {
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_detected_by_assumptions_key() {
        assert!(is_envelope(&json!({"assumptions": {}, "variation_percent": "20"})));
        assert!(!is_envelope(&json!({"ltm_revenue": "500"})));
        assert!(!is_envelope(&json!([1, 2])));
    }

    #[test]
    fn test_explicit_path_takes_precedence_over_stdin() {
        let err = read_request(Some("definitely/not/here.json"), "project").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
