mod auth;
mod catalog;
mod data;
mod shopify;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use pcsync_core::AppConfig;
use pcsync_shopify::{ShopifyClient, ShopifyError};
use pcsync_source::{SourceClient, SourceError};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

/// Most items accepted by the batch endpoints in one request.
pub(crate) const MAX_BATCH: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub source: Arc<SourceClient>,
    pub shopify: Arc<ShopifyClient>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Error body shared by every route: `{"error", "code", "meta"}`, plus the
/// upstream's own error payload under `details` when there is one.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub meta: ResponseMeta,
    #[serde(skip)]
    status: Option<StatusCode>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    version: &'static str,
}

impl ResponseMeta {
    pub(crate) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            details: None,
            meta: ResponseMeta::new(request_id.into()),
            status: None,
        }
    }

    /// Overrides the status derived from `code`, e.g. to pass an upstream
    /// status through.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    fn status(&self) -> StatusCode {
        if let Some(status) = self.status {
            return status;
        }
        match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "bad_gateway" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Upstream status as an axum status, when it is a real error status.
fn upstream_error_status(status: Option<u16>) -> Option<StatusCode> {
    status
        .and_then(|s| StatusCode::from_u16(s).ok())
        .filter(|s| s.is_client_error() || s.is_server_error())
}

/// Message shown to callers for a PC Service failure: the API's own message
/// when it sent one.
pub(crate) fn source_error_message(error: &SourceError) -> String {
    match error {
        SourceError::Api { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn map_source_error(request_id: String, error: &SourceError) -> ApiError {
    tracing::error!(request_id = %request_id, error = %error, "PC Service request failed");
    let api_error = ApiError::new(request_id, "upstream_error", source_error_message(error));
    match upstream_error_status(error.upstream_status()) {
        Some(status) => api_error.with_status(status),
        None => api_error.with_status(StatusCode::BAD_GATEWAY),
    }
}

pub(crate) fn map_shopify_error(request_id: String, error: &ShopifyError) -> ApiError {
    tracing::error!(request_id = %request_id, error = %error, "Shopify request failed");
    let details = error.upstream_body().and_then(|body| body.get("errors").cloned());
    let mut api_error = ApiError::new(request_id, "upstream_error", error.to_string())
        .with_status(
            upstream_error_status(error.upstream_status()).unwrap_or(StatusCode::BAD_GATEWAY),
        );
    if let Some(details) = details {
        api_error = api_error.with_details(details);
    }
    api_error
}

/// Unwraps a JSON body, turning axum's rejection into a 400 [`ApiError`].
pub(crate) fn json_body<T>(
    request_id: &RequestId,
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        ApiError::new(request_id.0.clone(), "bad_request", rejection.body_text())
    })
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn limited_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/login", post(auth::login))
        .route("/api/categories/", get(catalog::list_categories))
        .route("/api/categories/{category_id}", get(catalog::get_category))
        .route(
            "/api/categories/{category_id}/{subcategory_id}",
            get(catalog::list_subcategory_products),
        )
        .route("/api/product/{product_id}", get(catalog::get_product))
        .route("/api/products", post(catalog::get_products))
        .route(
            "/api/shopify/create_product",
            post(shopify::create_product),
        )
        .route(
            "/api/shopify/create_products",
            post(shopify::create_products),
        )
        .route("/api/data", get(data::snapshot_records))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(limited_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(Extension(req_id): Extension<RequestId>) -> impl IntoResponse {
    Json(ApiResponse {
        data: HealthData {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
