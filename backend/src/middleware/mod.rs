//! # Middleware
//!
//! [`AlertOnServerError`] watches every response. When one ends with
//! `500 Internal Server Error` it reports the request and the error to the
//! DingTalk robot in the background; the response itself is untouched.
//!
//! ```text
//! request ──► copy url/method/query ──► buffer JSON body ──► inner service
//!                                                               │
//!                                      response or Err, status == 500?
//!                                                               ▼
//!                                           build Alert ──► spawn Alerter::send
//! ```

use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::StatusCode;
use actix_web::web::{self, BytesMut};
use actix_web::{Error, HttpMessage};
use chrono::Utc;
use futures::future::LocalBoxFuture;
use futures::StreamExt;
use serde_json::Value;
use tracing::warn;

use crate::alert::{Alert, Alerter};
use crate::errors::ApiError;
use crate::query_model::is_json_content_type;

/// Largest JSON body buffered for alert reports; matches actix's JSON limit.
const MAX_CAPTURED_BODY: usize = 2 * 1024 * 1024;

/// Middleware factory. Register it last so it wraps everything else.
pub struct AlertOnServerError {
    alerter: Alerter,
}

impl AlertOnServerError {
    pub fn new(alerter: Alerter) -> Self {
        Self { alerter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AlertOnServerError
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AlertOnServerErrorMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AlertOnServerErrorMiddleware {
            service: Rc::new(service),
            alerter: self.alerter.clone(),
        }))
    }
}

pub struct AlertOnServerErrorMiddleware<S> {
    service: Rc<S>,
    alerter: Alerter,
}

impl<S, B> Service<ServiceRequest> for AlertOnServerErrorMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        // Owned copies only: routing needs the request to be uniquely owned.
        let info = RequestInfo::from_request(&req);
        let service = Rc::clone(&self.service);
        let alerter = self.alerter.clone();

        Box::pin(async move {
            let json = if is_json_content_type(&req.content_type().to_ascii_lowercase()) {
                capture_json(&mut req).await?
            } else {
                None
            };

            let result = service.call(req).await;

            let alert = match &result {
                Ok(res) => build_alert(info, json, res.status(), res.response().error(), &alerter),
                Err(err) => build_alert(
                    info,
                    json,
                    err.as_response_error().status_code(),
                    Some(err),
                    &alerter,
                ),
            };

            if let Some(alert) = alert {
                actix_rt::spawn(async move {
                    if let Err(e) = alerter.send(&alert).await {
                        warn!("Failed to send server error alert: {}", e);
                    }
                });
            }

            result
        })
    }
}

/// The parts of a request an alert reports, copied before the request is
/// handed to the inner service.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub url: String,
    pub method: String,
    pub query: String,
}

impl RequestInfo {
    pub fn from_request(req: &ServiceRequest) -> Self {
        let url = {
            let conn = req.connection_info();
            format!("{}://{}{}", conn.scheme(), conn.host(), req.uri())
        };

        Self {
            url,
            method: req.method().to_string(),
            query: req.query_string().to_string(),
        }
    }
}

/// Buffer the body, parse it as JSON and put the bytes back for the handler.
///
/// Bodies that are not valid JSON yield `None`; the handler reports them.
async fn capture_json(req: &mut ServiceRequest) -> Result<Option<Value>, Error> {
    let mut payload = req.take_payload();
    let mut body = BytesMut::new();

    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > MAX_CAPTURED_BODY {
            return Err(ApiError::server(413, "Request body is too large").into());
        }
        body.extend_from_slice(&chunk);
    }

    let body = body.freeze();
    let json = if body.is_empty() {
        None
    } else {
        serde_json::from_slice(&body).ok()
    };

    req.set_payload(Payload::from(body));
    Ok(json)
}

/// Build the alert for a finished request, or `None` if it did not fail with 500.
pub fn build_alert(
    info: RequestInfo,
    json: Option<Value>,
    status: StatusCode,
    error: Option<&Error>,
    alerter: &Alerter,
) -> Option<Alert> {
    if status != StatusCode::INTERNAL_SERVER_ERROR {
        return None;
    }

    let args = web::Query::<Vec<(String, String)>>::from_query(&info.query)
        .map(web::Query::into_inner)
        .unwrap_or_default();

    let (error, traceback) = match error {
        Some(err) => match err.as_error::<ApiError>() {
            Some(api_err) => (format!("{:?}", api_err), api_err.traceback()),
            None => (format!("{:?}", err), vec![err.to_string()]),
        },
        None => (format!("HTTP {}", status.as_u16()), Vec::new()),
    };

    Some(Alert {
        url: info.url,
        method: info.method,
        args,
        json,
        error,
        traceback,
        namespace: alerter.namespace().to_string(),
        hostname: alerter.hostname().to_string(),
        occurred_at: Utc::now(),
    })
}
