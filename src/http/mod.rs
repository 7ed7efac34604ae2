use actix_web::http::StatusCode;
use actix_web::{web, App, HttpResponse, HttpServer, ResponseError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::app::Application;
use crate::backbone::store::DbContext;
use crate::config::Config;
use crate::contracts::customer::{CreateCustomerCommand, CustomerInfo, GetCustomerByIdQuery};
use crate::contracts::order::{CancelOrderCommand, CreateOrderCommand};
use crate::errors::{AppError, ErrorKind};
use crate::metrics::{configure_metrics_routes, Metrics};

pub mod middleware;

pub use middleware::{RequestTracing, REQUEST_ID_HEADER};

// ============================================================================
// HTTP Surface - actix-web routes over the mediator
// ============================================================================
//
// POST   /api/v1/customers        create a customer
// GET    /api/v1/customers/{id}   fetch a customer
// POST   /api/v1/orders           create an order
// DELETE /api/v1/orders/{id}      cancel an order
// GET    /metrics, /health
//
// Every request passes through `RequestTracing` (request id, panic
// recovery, access log).
//
// ============================================================================

pub struct ApiState {
    pub app: Application,
    pub request_timeout: Duration,
}

impl ApiState {
    /// Request context bounded by the configured deadline
    fn request_context(&self) -> DbContext {
        self.app.context().with_timeout(self.request_timeout)
    }
}

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub email: String,
    pub credit: i64,
}

impl CreateCustomerRequest {
    fn validate(&self) -> Result<(), AppError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(AppError::input_validation("email is required"));
        }
        if !looks_like_email(email) {
            return Err(AppError::input_validation("email must be a valid email address"));
        }
        if self.credit <= 0 {
            return Err(AppError::input_validation("credit must be greater than 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub order_total: i64,
}

impl CreateOrderRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.order_total <= 0 {
            return Err(AppError::input_validation("order_total must be greater than 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub email: String,
    pub credit: i64,
}

impl From<CustomerInfo> for CustomerResponse {
    fn from(info: CustomerInfo) -> Self {
        Self {
            id: info.id,
            email: info.email,
            credit: info.credit,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|e| AppError::input_validation(format!("invalid id {raw:?}")).with_source(e))
}

// ============================================================================
// Error Mapping
// ============================================================================

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InputValidation => StatusCode::BAD_REQUEST,
            ErrorKind::BusinessRule => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::ResourceNotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::ServiceDependency => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, source = ?std::error::Error::source(self), "Request failed");
        }
        HttpResponse::build(status).json(ErrorBody {
            kind: self.kind().as_str().to_string(),
            message: self.message().to_string(),
        })
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_customer(
    state: web::Data<ApiState>,
    body: web::Json<CreateCustomerRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;

    let id = state
        .app
        .send(
            &state.request_context(),
            CreateCustomerCommand {
                email: body.email.trim().to_string(),
                credit: body.credit,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(CreatedResponse { id }))
}

async fn get_customer(state: web::Data<ApiState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let customer_id = parse_id(&path)?;
    let info = state
        .app
        .send(&state.request_context(), GetCustomerByIdQuery { customer_id })
        .await?;

    Ok(HttpResponse::Ok().json(CustomerResponse::from(info)))
}

async fn create_order(
    state: web::Data<ApiState>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;

    let id = state
        .app
        .send(
            &state.request_context(),
            CreateOrderCommand {
                customer_id: body.customer_id,
                order_total: body.order_total,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(CreatedResponse { id }))
}

async fn cancel_order(state: web::Data<ApiState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let order_id = parse_id(&path)?;
    state
        .app
        .send(&state.request_context(), CancelOrderCommand { order_id })
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Mount the API routes; expects `web::Data<ApiState>` as app data
pub fn configure_api_routes(cfg: &mut web::ServiceConfig) {
    let json = web::JsonConfig::default()
        .error_handler(|err, _req| AppError::input_validation(err.to_string()).into());

    cfg.service(
        web::scope("/api/v1")
            .app_data(json)
            .route("/customers", web::post().to(create_customer))
            .route("/customers/{id}", web::get().to(get_customer))
            .route("/orders", web::post().to(create_order))
            .route("/orders/{id}", web::delete().to(cancel_order)),
    );
}

// ============================================================================
// Server
// ============================================================================

/// Serve until SIGINT/SIGTERM, then drain in-flight requests
pub async fn serve(app: Application, config: &Config) -> std::io::Result<()> {
    let metrics: Arc<Metrics> = app.metrics().clone();
    let state = web::Data::new(ApiState {
        app,
        request_timeout: config.request_timeout,
    });
    let metrics = web::Data::new(metrics);

    tracing::info!(port = config.http_port, "🌐 HTTP server listening");

    HttpServer::new(move || {
        App::new()
            .wrap(RequestTracing)
            .app_data(state.clone())
            .app_data(metrics.clone())
            .configure(configure_api_routes)
            .configure(configure_metrics_routes)
    })
    .bind(("0.0.0.0", config.http_port))?
    .shutdown_timeout(config.graceful_timeout.as_secs().max(1))
    .run()
    .await?;

    tracing::info!("👋 HTTP server stopped");
    Ok(())
}
