//! # API Request Handlers
//!
//! Handler functions for the built-in blueprints. Handlers that take
//! arguments declare them with a [`Parsed`] query model; validation
//! failures never reach the handler body and are answered with 400.
//!
//! ## Error Handling
//!
//! Handlers return `Result<HttpResponse, ApiError>`. Errors are rendered as:
//!
//! ```json
//! {
//!     "error_code": 500,
//!     "error_msg": "Simulated failure",
//!     "traceback": ["Simulated failure"]
//! }
//! ```

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::routes::all_blueprints;
use crate::app::AppState;
use crate::errors::ApiError;
use crate::models::{
    ApiResponse, BlueprintInfo, EchoQuery, EchoResponse, FailQuery, HealthResponse,
    ServiceInfoResponse,
};
use crate::query_model::{NoArgs, Parsed, QueryModel};
use crate::utils::{format_datetime, DATETIME_FORMAT};

/// API information endpoint (root).
///
/// ## Endpoint
///
/// `GET /`
pub async fn api_info(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let blueprints = all_blueprints()
        .into_iter()
        .map(|b| BlueprintInfo {
            name: b.name.to_string(),
            url_prefix: b.url_prefix.to_string(),
        })
        .collect();

    HttpResponse::Ok().json(ApiResponse::success(ServiceInfoResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        namespace: state.config.namespace.clone(),
        blueprints,
    }))
}

/// Health check endpoint.
///
/// Returns 200 when the database answers `SELECT 1`, 503 otherwise.
///
/// ## Endpoint
///
/// `GET /health`
pub async fn health_check(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let db_healthy = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Health check failed: {}", e);
            false
        }
    };

    let pool = state.db.pool().status();

    let response = HealthResponse {
        status: if db_healthy { "healthy" } else { "unhealthy" }.to_string(),
        database: db_healthy,
        pool_size: pool.size as u64,
        pool_max_size: pool.max_size as u64,
        version: env!("CARGO_PKG_VERSION").to_string(),
        namespace: state.config.namespace.clone(),
        timestamp: format_datetime(Utc::now()),
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    HttpResponse::build(status_code).json(ApiResponse::success(response))
}

/// Echo the arguments parsed by [`EchoQuery`].
///
/// ## Endpoint
///
/// `GET /echo?q=rust&page=2` or `POST /echo` with a JSON or form body.
pub async fn echo(query: Parsed<EchoQuery>) -> Result<HttpResponse, ApiError> {
    info!("{}", query);

    if query.verbose {
        debug!(
            "page={} page_size={} order={} tags={:?} client={:?}",
            query.page, query.page_size, query.order, query.tags, query.client
        );
    }

    let offset = query
        .page
        .saturating_sub(1)
        .max(0)
        .checked_mul(query.page_size)
        .ok_or_else(|| {
            ApiError::InvalidArgument(format!(
                "page: page {} with page_size {} is out of range",
                query.page, query.page_size
            ))
        })?;

    let mut filters = Vec::new();
    if let Some(q) = &query.q {
        filters.push(format!("q={}", q));
    }
    if let Some(since) = &query.since {
        filters.push(format!("since={}", since.format(DATETIME_FORMAT)));
    }
    if query.args().contains("tags") {
        filters.push(format!("tags={}", query.tags.join(",")));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(EchoResponse {
        model: EchoQuery::model_name().to_string(),
        args: query.args().as_dict().clone(),
        offset: Some(offset),
        filters,
    })))
}

/// Endpoint without arguments.
///
/// ## Endpoint
///
/// `GET /echo/none`
pub async fn echo_none(query: Parsed<NoArgs>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(EchoResponse {
        model: NoArgs::model_name().to_string(),
        args: query.args().as_dict().clone(),
        offset: None,
        filters: Vec::new(),
    })))
}

/// Fail with the requested status code.
///
/// Used to exercise the error body and the server-error alert.
///
/// ## Endpoint
///
/// `GET /echo/fail?code=500&message=boom`
pub async fn echo_fail(query: Parsed<FailQuery>) -> Result<HttpResponse, ApiError> {
    info!("{}", query);
    Err(ApiError::server(query.code, query.message.clone()))
}

/// Answer for a known path requested with an unsupported method.
pub async fn method_not_allowed(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    Err(ApiError::MethodNotAllowed(format!(
        "The method {} is not allowed for the requested URL.",
        req.method()
    )))
}

/// Answer for paths no blueprint serves.
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound(format!(
        "The requested URL {} was not found on the server.",
        req.path()
    )))
}
