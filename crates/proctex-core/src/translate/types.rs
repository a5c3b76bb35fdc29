//! Conversion between MaterialX value strings and JSON values

use crate::mtlx::FILENAME_TYPE;
use serde_json::{Number, Value};
use tracing::warn;

/// How a MaterialX type is carried in JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    Integer,
    /// Fixed-size float tuples (vectors, colors, matrices)
    FloatArray,
    IntegerArray,
    Boolean,
    String,
    /// A file reference, carried as a texture index
    File,
    /// Anything else; passed through as a string
    Opaque,
}

impl ValueKind {
    /// Classify a MaterialX type name
    pub fn classify(value_type: &str) -> Self {
        match value_type {
            "float" => Self::Float,
            "integer" => Self::Integer,
            "vector2" | "vector3" | "vector4" | "color3" | "color4" | "matrix33"
            | "matrix44" | "floatarray" => Self::FloatArray,
            "integerarray" => Self::IntegerArray,
            "boolean" => Self::Boolean,
            "string" | "stringarray" => Self::String,
            FILENAME_TYPE => Self::File,
            _ => Self::Opaque,
        }
    }
}

/// Write a float the way MaterialX value strings expect it
pub fn format_float(value: f64) -> String {
    value.to_string()
}

/// Write a JSON number as a value string token
pub fn format_number(number: &Number) -> String {
    if let Some(value) = number.as_i64() {
        value.to_string()
    } else if let Some(value) = number.as_u64() {
        value.to_string()
    } else {
        number.as_f64().map(format_float).unwrap_or_default()
    }
}

fn parse_float(token: &str) -> Option<Value> {
    let value = token.trim().parse::<f64>().ok()?;
    Number::from_f64(value).map(Value::Number)
}

fn parse_integer(token: &str) -> Option<Value> {
    token.trim().parse::<i64>().ok().map(Value::from)
}

fn parse_list(value: &str, parse: fn(&str) -> Option<Value>) -> Option<Value> {
    value
        .split(',')
        .filter(|token| !token.trim().is_empty())
        .map(parse)
        .collect::<Option<Vec<_>>>()
        .map(Value::Array)
}

fn try_value_to_json(value: &str, kind: ValueKind) -> Option<Value> {
    match kind {
        ValueKind::Float => parse_float(value),
        ValueKind::Integer => parse_integer(value),
        ValueKind::FloatArray => parse_list(value, parse_float),
        ValueKind::IntegerArray => parse_list(value, parse_integer),
        ValueKind::Boolean => match value.trim() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        ValueKind::String | ValueKind::File => Some(Value::String(value.to_string())),
        ValueKind::Opaque => None,
    }
}

/// Convert a MaterialX value string to JSON.
///
/// Values of unknown types, or that fail to parse, are kept as strings.
pub fn value_to_json(value: &str, value_type: &str) -> Value {
    try_value_to_json(value, ValueKind::classify(value_type)).unwrap_or_else(|| {
        warn!("Passing through value '{value}' of type '{value_type}' as a string");
        Value::String(value.to_string())
    })
}

fn json_token(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(format_number(number)),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::String(text) => Some(text.clone()),
        _ => None,
    }
}

/// Convert a JSON value back to a MaterialX value string
pub fn json_to_value(value: &Value, value_type: &str) -> Option<String> {
    let converted = match value {
        Value::Array(items) => items
            .iter()
            .map(json_token)
            .collect::<Option<Vec<_>>>()
            .map(|tokens| tokens.join(", ")),
        other => json_token(other),
    };
    if converted.is_none() {
        warn!("Cannot convert {value} to a value of type '{value_type}'");
    }
    converted
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn test_classify() {
        assert_eq!(ValueKind::classify("float"), ValueKind::Float);
        assert_eq!(ValueKind::classify("color3"), ValueKind::FloatArray);
        assert_eq!(ValueKind::classify("matrix44"), ValueKind::FloatArray);
        assert_eq!(ValueKind::classify("filename"), ValueKind::File);
        assert_eq!(ValueKind::classify("BSDF"), ValueKind::Opaque);
    }

    #[test]
    fn test_scalars_and_arrays() {
        let value = value_to_json("0.25", "float");
        assert_relative_eq!(value.as_f64().unwrap_or_default(), 0.25);

        assert_eq!(value_to_json("3", "integer"), json!(3));
        assert_eq!(value_to_json("true", "boolean"), json!(true));
        assert_eq!(value_to_json("0.5, 1, 0", "color3"), json!([0.5, 1.0, 0.0]));
        assert_eq!(value_to_json("hello", "string"), json!("hello"));
    }

    #[test]
    fn test_unparsable_values_pass_through() {
        assert_eq!(value_to_json("abc", "float"), json!("abc"));
        assert_eq!(value_to_json("x", "BSDF"), json!("x"));
    }

    #[test]
    fn test_json_to_value() {
        assert_eq!(json_to_value(&json!(2.0), "float").as_deref(), Some("2"));
        assert_eq!(json_to_value(&json!(0.5), "float").as_deref(), Some("0.5"));
        assert_eq!(
            json_to_value(&json!([0.5, 1.0, 0.0]), "color3").as_deref(),
            Some("0.5, 1, 0")
        );
        assert_eq!(json_to_value(&json!(false), "boolean").as_deref(), Some("false"));
        assert_eq!(json_to_value(&json!({ "a": 1 }), "float"), None);
        assert_eq!(json_to_value(&Value::Null, "float"), None);
    }
}
