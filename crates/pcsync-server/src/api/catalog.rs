//! Read-through proxies to the PC Service catalog.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{json_body, map_source_error, source_error_message, ApiError, AppState, MAX_BATCH};
use crate::middleware::RequestId;

pub(super) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<Value>, ApiError> {
    proxy_categories(&state, req_id, None, None).await
}

pub(super) async fn get_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(category_id) = path_param(&req_id, path)?;
    proxy_categories(&state, req_id, Some(category_id), None).await
}

pub(super) async fn list_subcategory_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    path: Result<Path<(u64, u64)>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path((category_id, subcategory_id)) = path_param(&req_id, path)?;
    proxy_categories(&state, req_id, Some(category_id), Some(subcategory_id)).await
}

async fn proxy_categories(
    state: &AppState,
    req_id: RequestId,
    category_id: Option<u64>,
    subcategory_id: Option<u64>,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .source
        .categories(category_id, subcategory_id)
        .await
        .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    if body.is_array() || body.is_object() {
        Ok(Json(body))
    } else {
        tracing::error!(
            request_id = %req_id.0,
            "categories response is neither a list nor an object"
        );
        Err(ApiError::new(
            req_id.0,
            "internal_error",
            "unexpected categories response format",
        ))
    }
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(product_id) = path_param(&req_id, path)?;
    let product_id = positive_id(product_id)
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "bad_request", NOT_POSITIVE))?;

    state
        .source
        .product_json(product_id)
        .await
        .map(Json)
        .map_err(|e| map_source_error(req_id.0, &e))
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductsRequest {
    #[serde(default)]
    product_ids: Vec<Value>,
}

/// Looks up several products at once. Per-item failures are reported in the
/// result list; only a malformed request fails as a whole.
pub(super) async fn get_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<ProductsRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = json_body(&req_id, body)?;
    if request.product_ids.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "product_ids must be a non-empty list",
        ));
    }
    if request.product_ids.len() > MAX_BATCH {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            format!("at most {MAX_BATCH} products can be requested at once"),
        ));
    }

    let mut results = Vec::with_capacity(request.product_ids.len());
    for raw in request.product_ids {
        let Some(id) = parse_product_id(&raw) else {
            results.push(json!({ "product_id": raw, "status": "error", "message": NOT_A_NUMBER }));
            continue;
        };
        let Some(product_id) = positive_id(id) else {
            results.push(json!({ "product_id": id, "status": "error", "message": NOT_POSITIVE }));
            continue;
        };

        match state.source.product_json(product_id).await {
            Ok(data) => {
                results.push(json!({
                    "product_id": product_id,
                    "status": "success",
                    "data": data
                }));
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %req_id.0,
                    product_id,
                    error = %e,
                    "product lookup failed"
                );
                results.push(json!({
                    "product_id": product_id,
                    "status": "error",
                    "message": source_error_message(&e),
                }));
            }
        }
    }

    Ok(Json(json!({ "results": results })))
}

pub(super) const NOT_A_NUMBER: &str = "product id must be a valid number";
pub(super) const NOT_POSITIVE: &str = "product id must be a positive number";

/// Accepts a JSON integer or a string of digits with an optional sign.
pub(super) fn parse_product_id(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(super) fn positive_id(id: i64) -> Option<u64> {
    u64::try_from(id).ok().filter(|id| *id > 0)
}

fn path_param<T>(
    req_id: &RequestId,
    path: Result<Path<T>, PathRejection>,
) -> Result<Path<T>, ApiError> {
    path.map_err(|rejection| ApiError::new(req_id.0.clone(), "bad_request", rejection.body_text()))
}
