//! `--kwargs key:value` parsing.

use serde_json::{Map, Value};

use crate::error::{CliError, CliResult};

/// Split a `key:value` pair. The pair must contain exactly one colon and
/// a non-empty key.
pub fn parse_pair(raw: &str) -> CliResult<(String, String)> {
    let colons = raw.matches(':').count();
    if colons != 1 {
        return Err(CliError::InvalidArgument(format!(
            "kwargs '{}' must look like key:value with exactly one ':' (found {})",
            raw, colons
        )));
    }

    let (key, value) = raw.split_once(':').unwrap_or((raw, ""));
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::InvalidArgument(format!(
            "kwargs '{}' has an empty key",
            raw
        )));
    }

    Ok((key.to_string(), value.to_string()))
}

/// Parse every pair into a keyword-argument map. Later pairs win.
pub fn parse_all(raw: &[String]) -> CliResult<Map<String, Value>> {
    let mut kwargs = Map::new();
    for pair in raw {
        let (key, value) = parse_pair(pair)?;
        kwargs.insert(key, Value::String(value));
    }
    Ok(kwargs)
}

/// Remove `key` from `kwargs`, returning its value as a string.
pub fn take(kwargs: &mut Map<String, Value>, key: &str) -> Option<String> {
    match kwargs.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
        None => None,
    }
}
