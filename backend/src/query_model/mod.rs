//! # Query Models
//!
//! Declarative request-argument parsing. A query model lists the parameters
//! an endpoint expects and deserializes the parsed result into a typed struct.
//!
//! ## Declaring a model
//!
//! ```rust,ignore
//! #[derive(Debug, Deserialize)]
//! pub struct ListOrdersQuery {
//!     pub status: Option<String>,
//!     pub limit: i64,
//! }
//!
//! impl QueryModel for ListOrdersQuery {
//!     fn fields() -> Vec<QueryField> {
//!         vec![
//!             QueryField::new("status", ApiDataType::String)
//!                 .location(Location::Args)
//!                 .enum_values(["open", "closed"]),
//!             QueryField::new("limit", ApiDataType::Integer)
//!                 .location(Location::Args)
//!                 .default(20),
//!         ]
//!     }
//! }
//!
//! async fn list_orders(query: Parsed<ListOrdersQuery>) -> Result<HttpResponse, ApiError> {
//!     info!("{}", query);
//!     // query.limit, query.args().contains("status"), ...
//! }
//! ```

pub mod coerce;
pub mod extractor;
pub mod field;
pub mod parser;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::ApiError;

pub use extractor::{is_json_content_type, Parsed};
pub use field::{ApiDataType, Location, QueryField};
pub use parser::{Args, RequestParser, RequestSource};

/// A type whose fields describe expected request parameters.
pub trait QueryModel: DeserializeOwned {
    /// Field declarations, in parsing order.
    fn fields() -> Vec<QueryField>;

    /// Reject arguments that no field declares.
    fn strict() -> bool {
        false
    }

    /// Name shown when the parsed model is displayed.
    fn model_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    fn parser() -> RequestParser {
        RequestParser::new(Self::fields()).strict(Self::strict())
    }

    /// Parse `source` and build the model together with its raw arguments.
    fn parse_args(source: &RequestSource) -> Result<(Self, Args), ApiError> {
        let args = Self::parser().parse(source)?;
        let model = args.deserialize::<Self>()?;
        Ok((model, args))
    }
}

/// Model for endpoints that take no arguments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoArgs {}

impl QueryModel for NoArgs {
    fn fields() -> Vec<QueryField> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Listing {
        status: Option<String>,
        limit: i64,
        #[serde(default)]
        tags: Vec<String>,
    }

    impl QueryModel for Listing {
        fn fields() -> Vec<QueryField> {
            vec![
                QueryField::new("status", ApiDataType::String)
                    .location(Location::Args)
                    .enum_values(["open", "closed"]),
                QueryField::new("limit", ApiDataType::Integer)
                    .location(Location::Args)
                    .default(20),
                QueryField::new("tags", ApiDataType::List)
                    .location(Location::Args)
                    .skip_missing(),
            ]
        }
    }

    #[test]
    fn test_parse_args_builds_typed_model() {
        let source = RequestSource {
            args: vec![
                ("status".into(), "open".into()),
                ("tags".into(), "a,b".into()),
            ],
            ..Default::default()
        };

        let (model, args) = Listing::parse_args(&source).unwrap();

        assert_eq!(model.status.as_deref(), Some("open"));
        assert_eq!(model.limit, 20);
        assert_eq!(model.tags, vec!["a", "b"]);
        assert_eq!(args.get("limit"), Some(&json!(20)));
    }

    #[test]
    fn test_missing_skipped_field_uses_serde_default() {
        let (model, args) = Listing::parse_args(&RequestSource::default()).unwrap();

        assert!(model.status.is_none());
        assert!(model.tags.is_empty());
        assert!(!args.contains("tags"));
        assert!(args.contains("status"));
    }

    #[test]
    fn test_model_name() {
        assert_eq!(Listing::model_name(), "Listing");
        assert_eq!(NoArgs::model_name(), "NoArgs");
    }

    #[test]
    fn test_no_args_ignores_everything() {
        let source = RequestSource {
            args: vec![("anything".into(), "goes".into())],
            ..Default::default()
        };

        let (_, args) = NoArgs::parse_args(&source).unwrap();
        assert!(args.is_empty());
    }
}
