//! Value coercion for each [`ApiDataType`].
//!
//! Query strings, form bodies, headers and cookies deliver strings; JSON
//! bodies deliver typed values. Both end up as the same JSON value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Number, Value};

use super::field::ApiDataType;
use crate::utils::{DATETIME_FORMAT, DATE_FORMAT};

/// Convert `value` to the representation of `field_type`.
pub fn coerce(field_type: ApiDataType, value: &Value) -> Result<Value, String> {
    match field_type {
        ApiDataType::String => Ok(Value::String(to_text(value))),
        ApiDataType::Integer => to_integer(value),
        ApiDataType::Float => to_float(value),
        ApiDataType::Boolean => to_boolean(value),
        ApiDataType::Date => to_date(value),
        ApiDataType::DateTime => to_datetime(value),
        ApiDataType::Json => Ok(to_json(value)),
        ApiDataType::List => Ok(to_list(value)),
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_integer(value: &Value) -> Result<Value, String> {
    match value {
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                return Ok(Value::Number(n.clone()));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Value::from(f as i64)),
                _ => Err(format!("invalid integer value: {}", n)),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("invalid integer value: '{}'", s)),
        other => Err(format!("invalid integer value: {}", other)),
    }
}

fn to_float(value: &Value) -> Result<Value, String> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| format!("invalid float value: {}", display(value)))
}

fn to_boolean(value: &Value) -> Result<Value, String> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Ok(Value::Bool(true)),
            Some(0) => Ok(Value::Bool(false)),
            _ => Err(format!("Invalid literal for boolean(): {}", n)),
        },
        Value::String(s) if s.is_empty() => Err("Boolean type must be non-null".to_string()),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
            _ => Err(format!("Invalid literal for boolean(): {}", s)),
        },
        other => Err(format!("Invalid literal for boolean(): {}", other)),
    }
}

fn to_date(value: &Value) -> Result<Value, String> {
    let text = to_text(value);
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map(|d| Value::String(d.format(DATE_FORMAT).to_string()))
        .map_err(|_| format!("invalid date value: '{}', expected YYYY-MM-DD", text))
}

fn to_datetime(value: &Value) -> Result<Value, String> {
    let text = to_text(value);
    let trimmed = text.trim();

    let parsed = NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).naive_utc())
        });

    parsed
        .map(|dt| Value::String(dt.format(DATETIME_FORMAT).to_string()))
        .ok_or_else(|| format!("invalid datetime value: '{}', expected YYYY-MM-DD HH:MM:SS", text))
}

fn to_json(value: &Value) -> Value {
    match value {
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

fn to_list(value: &Value) -> Value {
    match value {
        Value::Array(_) => value.clone(),
        Value::String(s) => Value::Array(
            s.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        ),
        other => Value::Array(vec![other.clone()]),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        other => other.to_string(),
    }
}
