//! Typed access to tool-call arguments.
//!
//! Arguments arrive as a JSON object. An explicit `null` is treated the same
//! as an omitted argument; a value of the wrong type is an error rather than
//! being silently replaced by the default.

use serde_json::{Map, Value};

use super::ToolError;

/// Tool-call arguments.
pub type Arguments = Map<String, Value>;

fn present<'a>(args: &'a Arguments, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}

/// A required string argument.
pub fn required_str<'a>(args: &'a Arguments, name: &str) -> Result<&'a str, ToolError> {
    optional_str(args, name)?.ok_or_else(|| ToolError::invalid(name, "is required"))
}

/// An optional string argument. Empty strings count as omitted.
pub fn optional_str<'a>(args: &'a Arguments, name: &str) -> Result<Option<&'a str>, ToolError> {
    match present(args, name) {
        None => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ToolError::invalid(
            name,
            format!("expected a string, got {}", type_name(other)),
        )),
    }
}

/// An optional integer argument.
///
/// Accepts JSON integers and floats with no fractional part (some clients
/// send every number as a double).
#[allow(clippy::cast_possible_truncation)] // guarded by the fract and magnitude checks
pub fn optional_int(args: &Arguments, name: &str) -> Result<Option<i64>, ToolError> {
    let Some(value) = present(args, name) else {
        return Ok(None);
    };

    let parsed = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
            .map(|f| f as i64)
    });

    parsed.map(Some).ok_or_else(|| {
        ToolError::invalid(name, format!("expected an integer, got {}", type_name(value)))
    })
}

/// A required integer argument.
pub fn required_int(args: &Arguments, name: &str) -> Result<i64, ToolError> {
    optional_int(args, name)?.ok_or_else(|| ToolError::invalid(name, "is required"))
}

/// An optional integer argument that must be at least 1.
pub fn positive_int(args: &Arguments, name: &str, default: u64) -> Result<u64, ToolError> {
    match optional_int(args, name)? {
        None => Ok(default),
        Some(n) if n >= 1 => Ok(n.unsigned_abs()),
        Some(n) => Err(ToolError::invalid(name, format!("must be at least 1, got {n}"))),
    }
}

/// A required resource identifier.
///
/// Identifiers are positive integers, given either as a JSON number or as a
/// string of digits. Anything else is rejected, so the result is safe to
/// place in a request path.
pub fn required_id(args: &Arguments, name: &str) -> Result<u64, ToolError> {
    optional_id(args, name)?.ok_or_else(|| ToolError::invalid(name, "is required"))
}

/// An optional resource identifier. See [`required_id`].
pub fn optional_id(args: &Arguments, name: &str) -> Result<Option<u64>, ToolError> {
    let Some(value) = present(args, name) else {
        return Ok(None);
    };

    let id = match value {
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => optional_int(args, name)?.and_then(|n| u64::try_from(n).ok()),
    };

    id.filter(|&n| n > 0)
        .map(Some)
        .ok_or_else(|| ToolError::invalid(name, "must be a positive integer ID"))
}

/// An optional string argument restricted to `allowed`.
///
/// Matching is exact.
pub fn optional_choice<'a>(
    args: &'a Arguments,
    name: &str,
    allowed: &[&'static str],
) -> Result<Option<&'a str>, ToolError> {
    match optional_str(args, name)? {
        None => Ok(None),
        Some(value) if allowed.iter().any(|a| *a == value) => Ok(Some(value)),
        Some(value) => Err(ToolError::invalid(
            name,
            format!("'{value}' is not one of: {}", allowed.join(", ")),
        )),
    }
}

/// Like [`optional_choice`], falling back to `default` when omitted.
pub fn choice<'a>(
    args: &'a Arguments,
    name: &str,
    allowed: &[&'static str],
    default: &'a str,
) -> Result<&'a str, ToolError> {
    Ok(optional_choice(args, name, allowed)?.unwrap_or(default))
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Renders a scalar response field for a human-readable message.
///
/// Strings are shown without quotes; anything else as compact JSON.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
