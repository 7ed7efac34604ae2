use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{Error, ResponseError};
use futures_util::future::{FutureExt, LocalBoxFuture};
use std::future::{ready, Ready};
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use uuid::Uuid;

use crate::backbone::panic_message;
use crate::errors::AppError;

// ============================================================================
// Request Tracing Middleware
// ============================================================================
//
// - tags every request with an `x-request-id` (incoming value kept when sane)
// - turns a panicking handler into a 500 with the usual error body
// - emits one access-log line with status and latency
//
// ============================================================================

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

pub struct RequestTracing;

impl<S, B> Transform<S, ServiceRequest> for RequestTracing
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestTracingMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestTracingMiddleware { service }))
    }
}

pub struct RequestTracingMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestTracingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let request_id = incoming_request_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
        let method = req.method().to_string();
        let path = req.path().to_string();
        let http_req = req.request().clone();

        let response = self.service.call(req);

        Box::pin(async move {
            let mut res = match AssertUnwindSafe(response).catch_unwind().await {
                Ok(Ok(res)) => res.map_into_boxed_body(),
                Ok(Err(e)) => ServiceResponse::from_err(e, http_req),
                Err(payload) => {
                    tracing::error!(
                        %request_id,
                        %method,
                        %path,
                        panic = %panic_message(payload.as_ref()),
                        "💥 Handler panicked"
                    );
                    let body = AppError::operation_failed("internal server error").error_response();
                    ServiceResponse::new(http_req, body)
                }
            };

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            tracing::info!(
                %request_id,
                %method,
                %path,
                status = res.status().as_u16(),
                latency_ms = started.elapsed().as_millis() as u64,
                "HTTP request"
            );
            Ok(res)
        })
    }
}

fn incoming_request_id(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty() && value.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_owned)
}
