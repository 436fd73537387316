//! # Request Parser
//!
//! Applies a list of [`QueryField`]s to a [`RequestSource`] and produces the
//! parsed [`Args`].
//!
//! ## Per-field flow
//!
//! ```text
//! collect raw values from each location
//!         ↓
//! null check → trim → lowercase → convert (parse_func or field_type)
//!         ↓
//! nothing found? → required error | default | skipped
//!         ↓
//! Store (first value) | Append (all values)
//!         ↓
//! enum check
//! ```

use std::collections::BTreeSet;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::field::{Action, Location, QueryField};
use super::coerce::coerce;
use crate::errors::ApiError;

/// Everything a field can be read from, captured from one request.
#[derive(Debug, Clone, Default)]
pub struct RequestSource {
    /// Decoded query string pairs, in order. Keys may repeat.
    pub args: Vec<(String, String)>,

    /// Decoded urlencoded body pairs.
    pub form: Vec<(String, String)>,

    /// Parsed JSON body, if the request carried one.
    pub json: Option<Value>,

    pub headers: Vec<(String, String)>,

    pub cookies: Vec<(String, String)>,
}

impl RequestSource {
    /// Raw values for `field` across all of its locations, in order.
    fn collect(&self, field: &QueryField) -> Vec<Value> {
        let mut values = Vec::new();

        for location in &field.locations {
            match location {
                Location::Args => push_pairs(&mut values, &self.args, &field.name),
                Location::Form => push_pairs(&mut values, &self.form, &field.name),
                Location::Values => {
                    push_pairs(&mut values, &self.args, &field.name);
                    push_pairs(&mut values, &self.form, &field.name);
                }
                Location::Cookies => push_pairs(&mut values, &self.cookies, &field.name),
                Location::Headers => values.extend(
                    self.headers
                        .iter()
                        .filter(|(k, _)| k.eq_ignore_ascii_case(&field.name))
                        .map(|(_, v)| Value::String(v.clone())),
                ),
                Location::Json => {
                    let found = self
                        .json
                        .as_ref()
                        .and_then(Value::as_object)
                        .and_then(|body| body.get(&field.name));

                    match found {
                        Some(Value::Array(items)) if field.action == Action::Append => {
                            values.extend(items.iter().cloned())
                        }
                        Some(value) => values.push(value.clone()),
                        None => {}
                    }
                }
            }
        }

        values
    }

    /// Argument names sent in the query string, form body or JSON body.
    fn argument_names(&self) -> BTreeSet<&str> {
        let mut names: BTreeSet<&str> = self
            .args
            .iter()
            .chain(self.form.iter())
            .map(|(k, _)| k.as_str())
            .collect();

        if let Some(body) = self.json.as_ref().and_then(Value::as_object) {
            names.extend(body.keys().map(String::as_str));
        }

        names
    }
}

fn push_pairs(values: &mut Vec<Value>, pairs: &[(String, String)], name: &str) {
    values.extend(
        pairs
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| Value::String(v.clone())),
    );
}

/// Parsed request arguments, keyed by field name (or `dest`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Args(Map<String, Value>);

impl Args {
    /// All stored arguments.
    pub fn as_dict(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deserialize the arguments into a typed model.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| ApiError::InvalidArgument(format!("Invalid arguments: {}", e)))
    }

    fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pretty = serde_json::to_string_pretty(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&pretty)
    }
}

/// Parser built from a model's field declarations.
#[derive(Debug, Clone, Default)]
pub struct RequestParser {
    fields: Vec<QueryField>,
    strict: bool,
}

impl RequestParser {
    pub fn new(fields: Vec<QueryField>) -> Self {
        Self {
            fields,
            strict: false,
        }
    }

    /// Reject arguments no field declares.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Parse every declared field out of `source`.
    ///
    /// The first failing field aborts parsing with an
    /// [`ApiError::InvalidArgument`].
    pub fn parse(&self, source: &RequestSource) -> Result<Args, ApiError> {
        let mut args = Args::default();

        for field in &self.fields {
            if let Some(value) = self.parse_field(field, source)? {
                args.insert(field.key(), value);
            }
        }

        for field in &self.fields {
            if let Some(value) = args.get(field.key()) {
                check_enum(field, value)?;
            }
        }

        if self.strict {
            let known: BTreeSet<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();
            let unknown: Vec<&str> = source
                .argument_names()
                .into_iter()
                .filter(|name| !known.contains(name))
                .collect();

            if !unknown.is_empty() {
                return Err(ApiError::InvalidArgument(format!(
                    "Unknown arguments: {}",
                    unknown.join(", ")
                )));
            }
        }

        if args.is_empty() {
            debug!("No arguments parsed");
        } else {
            debug!("Parsed {} argument(s)", args.len());
        }

        Ok(args)
    }

    fn parse_field(&self, field: &QueryField, source: &RequestSource) -> Result<Option<Value>, ApiError> {
        let mut results = Vec::new();

        for raw in source.collect(field) {
            match convert(field, raw) {
                Ok(value) => results.push(value),
                Err(_) if field.ignore => continue,
                Err(reason) => return Err(ApiError::InvalidArgument(field.message(&reason))),
            }
        }

        if results.is_empty() {
            if field.required {
                let reason = format!("Missing required parameter in {}", field.friendly_locations());
                return Err(ApiError::InvalidArgument(field.message(&reason)));
            }
            if !field.store_missing {
                return Ok(None);
            }
            return Ok(Some(field.default.clone().unwrap_or(Value::Null)));
        }

        match field.action {
            Action::Append => Ok(Some(Value::Array(results))),
            Action::Store => Ok(results.into_iter().next()),
        }
    }
}

/// Null check, string normalization, then conversion.
fn convert(field: &QueryField, raw: Value) -> Result<Value, String> {
    if raw.is_null() {
        if !field.nullable {
            return Err("Must not be null!".to_string());
        }
        return Ok(Value::Null);
    }

    let raw = match raw {
        Value::String(s) => {
            let s = if field.trim { s.trim().to_string() } else { s };
            let s = if field.case_sensitive { s } else { s.to_lowercase() };
            Value::String(s)
        }
        other => other,
    };

    match field.parse_func {
        Some(parse) => parse(&raw),
        None => coerce(field.field_type, &raw),
    }
}

fn check_enum(field: &QueryField, value: &Value) -> Result<(), ApiError> {
    if field.enum_values.is_empty() {
        return Ok(());
    }

    let accepted = |candidate: &Value| {
        candidate.is_null()
            || field
                .enum_values
                .iter()
                .any(|allowed| enum_matches(field, allowed, candidate))
    };

    let ok = match value {
        Value::Array(items) if field.action == Action::Append => items.iter().all(accepted),
        other => accepted(other),
    };

    if ok {
        return Ok(());
    }

    let allowed = field
        .enum_values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ");

    Err(ApiError::InvalidArgument(format!(
        "parameter [{}] must be one of [{}]",
        field.name, allowed
    )))
}

fn enum_matches(field: &QueryField, allowed: &Value, candidate: &Value) -> bool {
    match (allowed, candidate) {
        (Value::String(a), Value::String(c)) if !field.case_sensitive => a.to_lowercase() == *c,
        (Value::Number(a), Value::Number(c)) => a == c || a.as_f64() == c.as_f64(),
        _ => allowed == candidate,
    }
}
