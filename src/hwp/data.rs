//! Loading a [`SubstitutionMap`] from a data file
//!
//! The file holds one flat mapping of field name to string or number. JSON
//! is the default; files ending in `.yaml` or `.yml` are read as YAML.

use crate::common::error::{Error, Result};
use crate::hwp::substitute::SubstitutionMap;
use serde_json::Value;
use std::path::Path;

/// Read and parse the data file at `path`
pub fn load_map(path: impl AsRef<Path>) -> Result<SubstitutionMap> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml { parse_yaml(&text) } else { parse_json(&text) }
}

pub fn parse_json(text: &str) -> Result<SubstitutionMap> {
    let value: Value = serde_json::from_str(text)?;
    from_value(value)
}

pub fn parse_yaml(text: &str) -> Result<SubstitutionMap> {
    let value: Value =
        serde_saphyr::from_str(text).map_err(|e| Error::Data(format!("Invalid YAML: {}", e)))?;
    from_value(value)
}

/// Convert a parsed document into a map
///
/// Strings are taken as-is and numbers in their shortest textual form.
/// Anything else is a data error.
pub fn from_value(value: Value) -> Result<SubstitutionMap> {
    let Value::Object(object) = value else {
        return Err(Error::Data(format!(
            "Data must be a mapping of field names to values, found {}",
            kind_of(&value)
        )));
    };

    let mut map = SubstitutionMap::new();
    for (field, value) in object {
        let text = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => {
                return Err(Error::Data(format!(
                    "Value for '{}' must be a string or number, found {}",
                    field,
                    kind_of(&other)
                )));
            },
        };
        map.insert(field, text);
    }
    Ok(map)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}
