//! # Error Handling
//!
//! Every handler returns `Result<_, ApiError>`. Actix turns the error into a
//! JSON response through [`ResponseError`], so all failures share one shape:
//!
//! ```json
//! {
//!     "error_code": 400,
//!     "error_msg": "limit: invalid digit found in string",
//!     "traceback": ["limit: invalid digit found in string"]
//! }
//! ```
//!
//! Extractor failures raised by actix itself (malformed JSON, bad query
//! strings, unknown routes) are converted into `ApiError` by the handlers
//! registered in `app::create_app`.

use std::error::Error as StdError;

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError, UrlencodedError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use thiserror::Error;
use tracing::{error, warn};

use crate::db::DatabaseError;
use crate::models::ErrorBody;

/// Maximum number of entries in a rendered traceback.
pub const TRACEBACK_LIMIT: usize = 10;

/// Errors returned by request handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A request argument failed validation.
    #[error("{0}")]
    InvalidArgument(String),

    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The route exists but not for this method.
    #[error("{0}")]
    MethodNotAllowed(String),

    /// An application error carrying its own HTTP status code.
    #[error("{message}")]
    Server { code: u16, message: String },

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ApiError {
    /// Shorthand for [`ApiError::Server`].
    pub fn server(code: u16, message: impl Into<String>) -> Self {
        ApiError::Server {
            code,
            message: message.into(),
        }
    }

    /// Numeric status code reported in `error_code`.
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    /// The error and its sources, outermost first.
    pub fn traceback(&self) -> Vec<String> {
        traceback(self, TRACEBACK_LIMIT)
    }

    /// The JSON body sent to the client.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error_code: self.code(),
            error_msg: self.to_string(),
            traceback: self.traceback(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Server { code, .. } => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed ({}): {:?}", status.as_u16(), self);
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), self);
        }

        HttpResponse::build(status).json(self.body())
    }
}

/// Render an error's `source()` chain as a list of strings.
pub fn traceback(err: &(dyn StdError + 'static), limit: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = Some(err);
    while let Some(e) = current {
        if lines.len() >= limit {
            break;
        }
        lines.push(e.to_string());
        current = e.source();
    }
    lines
}

// ============================================
// EXTRACTOR ERROR HANDLERS
// ============================================

/// Malformed or oversized JSON bodies.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::InvalidArgument(format!("Invalid JSON body: {}", err)).into()
}

/// Query strings that cannot be decoded.
pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::InvalidArgument(format!("Invalid query string: {}", err)).into()
}

/// Urlencoded form bodies that cannot be decoded.
pub fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::InvalidArgument(format!("Invalid form body: {}", err)).into()
}

/// Path segments that do not match the handler's types.
pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::NotFound(format!("Invalid path: {}", err)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::InvalidArgument("x".into()).code(), 400);
        assert_eq!(ApiError::NotFound("x".into()).code(), 404);
        assert_eq!(ApiError::MethodNotAllowed("x".into()).code(), 405);
        assert_eq!(ApiError::server(418, "teapot").code(), 418);
        assert_eq!(ApiError::from(DatabaseError::ConnectionError("x".into())).code(), 500);
    }

    #[test]
    fn test_invalid_server_code_falls_back_to_500() {
        assert_eq!(ApiError::server(42, "nonsense").code(), 500);
    }

    #[test]
    fn test_traceback_follows_source_chain() {
        let err = ApiError::from(DatabaseError::ConnectionError("refused".into()));
        let lines = err.traceback();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Database error: Database connection failed: refused");
        assert_eq!(lines[1], "Database connection failed: refused");
    }

    #[test]
    fn test_traceback_respects_limit() {
        let err = ApiError::from(DatabaseError::ConnectionError("refused".into()));
        assert_eq!(traceback(&err, 1).len(), 1);
    }

    #[actix_web::test]
    async fn test_error_response_body() {
        let err = ApiError::InvalidArgument("limit: Missing required parameter in the query string".into());
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["error_code"], 400);
        assert_eq!(body["error_msg"], "limit: Missing required parameter in the query string");
        assert_eq!(body["traceback"][0], "limit: Missing required parameter in the query string");
    }
}
