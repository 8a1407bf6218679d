use serde::de::DeserializeOwned;
use std::io::{self, Read};

use super::file::{parse, InputFormat};

/// Read a typed input piped on stdin. `None` when stdin is a terminal or the
/// pipe carried nothing.
pub fn read_stdin<T: DeserializeOwned>(what: &str) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer, what)
}

/// Piped text starting with `{` or `[` is JSON; anything else is tried as YAML.
pub(crate) fn parse_piped<T: DeserializeOwned>(
    text: &str,
    what: &str,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let format = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        InputFormat::Json
    } else {
        InputFormat::Yaml
    };
    parse(trimmed, format)
        .map(Some)
        .map_err(|e| format!("Failed to parse {what} input from stdin: {e}").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundedness_core::withdrawals::comparison::CompareInput;

    #[test]
    fn test_blank_pipe_is_none() {
        let parsed: Option<CompareInput> = parse_piped("  \n", "comparison").unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_json_and_yaml_pipes() {
        let json: Option<CompareInput> =
            parse_piped(r#"{"initial_wealth": 750000}"#, "comparison").unwrap();
        assert_eq!(json.unwrap().initial_wealth, 750_000.0);

        let yaml: Option<CompareInput> =
            parse_piped("initial_wealth: 750000\nstock_weight: 0.5\n", "comparison").unwrap();
        assert_eq!(yaml.unwrap().stock_weight, 0.5);
    }

    #[test]
    fn test_error_names_the_input() {
        let err = parse_piped::<CompareInput>("{\"initial_wealth\": }", "strategy comparison")
            .unwrap_err();
        assert!(err.to_string().contains("strategy comparison"));
    }
}
