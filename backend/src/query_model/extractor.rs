//! # Actix Extractor
//!
//! `Parsed<M>` reads the request (query string, body, headers, cookies),
//! runs `M`'s parser and hands the typed model to the handler.
//!
//! Only `application/x-www-form-urlencoded` bodies feed the `Form` location.
//! `multipart/form-data` bodies are not decoded, so fields declared there
//! see no values.

use std::fmt;
use std::ops::Deref;

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;

use super::parser::{Args, RequestSource};
use super::QueryModel;
use crate::errors::ApiError;

/// A parsed query model plus the raw arguments it was built from.
pub struct Parsed<M> {
    model: M,
    args: Args,
}

impl<M> Parsed<M> {
    pub fn args(&self) -> &Args {
        &self.args
    }
}

impl<M> Deref for Parsed<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.model
    }
}

impl<M: QueryModel> fmt::Display for Parsed<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[<{}>: \n{}]", M::model_name(), self.args)
    }
}

impl<M: QueryModel + 'static> FromRequest for Parsed<M> {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        let body = web::Bytes::from_request(&req, payload);

        Box::pin(async move {
            let body = body
                .await
                .map_err(|e| ApiError::InvalidArgument(format!("Invalid request body: {}", e)))?;

            let source = request_source(&req, &body)?;
            let (model, args) = M::parse_args(&source)?;
            Ok(Parsed { model, args })
        })
    }
}

/// Capture everything a query field may read from `req`.
pub fn request_source(req: &HttpRequest, body: &[u8]) -> Result<RequestSource, ApiError> {
    let args = decode_pairs(req.query_string())
        .map_err(|e| ApiError::InvalidArgument(format!("Invalid query string: {}", e)))?;

    let content_type = req.content_type().to_ascii_lowercase();

    let json = if is_json_content_type(&content_type) && !body.is_empty() {
        Some(
            serde_json::from_slice(body)
                .map_err(|e| ApiError::InvalidArgument(format!("Invalid JSON body: {}", e)))?,
        )
    } else {
        None
    };

    let form = if content_type == "application/x-www-form-urlencoded" {
        let text = std::str::from_utf8(body)
            .map_err(|e| ApiError::InvalidArgument(format!("Invalid form body: {}", e)))?;
        decode_pairs(text).map_err(|e| ApiError::InvalidArgument(format!("Invalid form body: {}", e)))?
    } else {
        Vec::new()
    };

    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let cookies: Vec<(String, String)> = req
        .cookies()
        .map(|cookies| {
            cookies
                .iter()
                .map(|c| (c.name().to_string(), c.value().to_string()))
                .collect()
        })
        .unwrap_or_default();

    Ok(RequestSource {
        args,
        form,
        json,
        headers,
        cookies,
    })
}

/// `application/json` or any `+json` media type. Expects a lowercased value.
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type == "application/json" || content_type.ends_with("+json")
}

/// Decode `a=1&b=2` pairs with the same decoder actix uses for `web::Query`.
fn decode_pairs(raw: &str) -> Result<Vec<(String, String)>, actix_web::error::QueryPayloadError> {
    web::Query::<Vec<(String, String)>>::from_query(raw).map(web::Query::into_inner)
}
