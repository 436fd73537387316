//! # API Request Models
//!
//! Query models for the built-in endpoints. Each struct lists its fields
//! through [`QueryModel::fields`] and receives the parsed values via serde.

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::query_model::{ApiDataType, Location, QueryField, QueryModel};

/// Arguments accepted by `/echo`.
///
/// ## Example URL
///
/// ```text
/// GET /echo?q=rust&page=2&order=DESC&tag=a&tag=b&since=2024-01-01%2000:00:00
/// ```
///
/// The same names are accepted in a JSON or form body.
#[derive(Debug, Clone, Deserialize)]
pub struct EchoQuery {
    /// Free-text search term.
    pub q: Option<String>,

    /// Page number, starting at 1.
    pub page: i64,

    /// Page size.
    pub page_size: i64,

    /// Sort order: asc or desc.
    pub order: String,

    /// Repeated `tag` parameters.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Only items changed after this moment.
    #[serde(default, with = "crate::utils::optional_datetime_format")]
    pub since: Option<NaiveDateTime>,

    pub verbose: bool,

    /// Caller identification, read from the `X-Client` header.
    pub client: Option<String>,
}

impl QueryModel for EchoQuery {
    fn fields() -> Vec<QueryField> {
        vec![
            QueryField::new("q", ApiDataType::String)
                .locations([Location::Args, Location::Form, Location::Json])
                .trim()
                .comment("Free-text search term"),
            QueryField::new("page", ApiDataType::Integer)
                .nullable(false)
                .default(1)
                .help("page number, starting at 1"),
            QueryField::new("page_size", ApiDataType::Integer)
                .enum_values([10, 20, 50, 100])
                .default(20),
            QueryField::new("order", ApiDataType::String)
                .trim()
                .case_insensitive()
                .enum_values(["asc", "desc"])
                .default("asc"),
            QueryField::new("tag", ApiDataType::String)
                .append()
                .dest("tags")
                .skip_missing(),
            QueryField::new("since", ApiDataType::DateTime),
            QueryField::new("verbose", ApiDataType::Boolean)
                .ignore_errors()
                .default(false),
            QueryField::new("X-Client", ApiDataType::String)
                .location(Location::Headers)
                .dest("client"),
        ]
    }
}

/// Arguments accepted by `/echo/fail`.
///
/// ```text
/// GET /echo/fail?code=500&message=boom
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct FailQuery {
    /// Status code of the raised error, 400 to 599.
    pub code: u16,

    pub message: String,
}

impl QueryModel for FailQuery {
    fn fields() -> Vec<QueryField> {
        vec![
            QueryField::new("code", ApiDataType::Integer)
                .location(Location::Args)
                .required()
                .parse_with(error_status),
            QueryField::new("message", ApiDataType::String)
                .location(Location::Args)
                .default("Simulated failure"),
        ]
    }

    fn strict() -> bool {
        true
    }
}

/// Accept only client and server error codes.
fn error_status(value: &Value) -> Result<Value, String> {
    let code = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match code {
        Some(code @ 400..=599) => Ok(Value::from(code)),
        _ => Err(format!("'{}' is not an error status code", value_text(value))),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_model::RequestSource;
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> RequestSource {
        RequestSource {
            args: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_echo_defaults() {
        let (echo, args) = EchoQuery::parse_args(&RequestSource::default()).unwrap();

        assert!(echo.q.is_none());
        assert_eq!(echo.page, 1);
        assert_eq!(echo.page_size, 20);
        assert_eq!(echo.order, "asc");
        assert!(echo.tags.is_empty());
        assert!(echo.since.is_none());
        assert!(!echo.verbose);
        assert!(!args.contains("tags"));
    }

    #[test]
    fn test_echo_bad_verbose_is_ignored() {
        let (echo, _) = EchoQuery::parse_args(&query(&[("verbose", "maybe")])).unwrap();
        assert!(!echo.verbose);
    }

    #[test]
    fn test_echo_q_from_json_body() {
        let source = RequestSource {
            json: Some(json!({"q": " tokio "})),
            ..Default::default()
        };
        let (echo, _) = EchoQuery::parse_args(&source).unwrap();
        assert_eq!(echo.q.as_deref(), Some("tokio"));
    }

    #[test]
    fn test_echo_from_query_string() {
        let source = query(&[
            ("q", "  rust "),
            ("page", "3"),
            ("order", "DESC"),
            ("tag", "a"),
            ("tag", "b"),
            ("since", "2024-01-01T08:00:00Z"),
            ("verbose", "yes"),
        ]);

        let (echo, args) = EchoQuery::parse_args(&source).unwrap();

        assert_eq!(echo.q.as_deref(), Some("rust"));
        assert_eq!(echo.page, 3);
        assert_eq!(echo.order, "desc");
        assert_eq!(echo.tags, vec!["a", "b"]);
        assert_eq!(args.get("since"), Some(&json!("2024-01-01 08:00:00")));
        assert!(echo.since.is_some());
        assert!(echo.verbose);
    }

    #[test]
    fn test_echo_page_size_enum() {
        assert!(EchoQuery::parse_args(&query(&[("page_size", "50")])).is_ok());
        assert!(EchoQuery::parse_args(&query(&[("page_size", "30")])).is_err());
    }

    #[test]
    fn test_echo_page_must_not_be_null() {
        let source = RequestSource {
            json: Some(json!({"page": null})),
            ..Default::default()
        };
        assert!(EchoQuery::parse_args(&source).is_err());
    }

    #[test]
    fn test_fail_query_is_strict() {
        let (fail, _) = FailQuery::parse_args(&query(&[("code", "503")])).unwrap();
        assert_eq!(fail.code, 503);
        assert_eq!(fail.message, "Simulated failure");

        assert!(FailQuery::parse_args(&query(&[("code", "503"), ("codes", "503")])).is_err());
    }

    #[test]
    fn test_fail_code_is_required() {
        let err = FailQuery::parse_args(&RequestSource::default()).unwrap_err();
        assert_eq!(err.to_string(), "code: Missing required parameter in the query string");
    }

    #[test]
    fn test_fail_code_must_be_error_status() {
        let err = FailQuery::parse_args(&query(&[("code", "200")])).unwrap_err();
        assert_eq!(err.to_string(), "code: '200' is not an error status code");

        assert!(FailQuery::parse_args(&query(&[("code", "abc")])).is_err());
    }
}
