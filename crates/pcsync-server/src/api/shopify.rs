//! Product creation in Shopify on behalf of the admin frontend.

use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use pcsync_core::{apply_margin, category_tags};
use pcsync_shopify::{NewImage, NewProduct, NewVariant, ProductStatus};
use pcsync_source::SourceProduct;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use super::catalog::{positive_id, NOT_A_NUMBER, NOT_POSITIVE};
use super::{json_body, map_shopify_error, source_error_message, ApiError, AppState, MAX_BATCH};
use crate::middleware::RequestId;

/// Creates one product from a frontend-shaped payload and returns Shopify's
/// response unchanged.
pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let data = json_body(&req_id, body)?;
    let Some(fields) = data.as_object().filter(|o| !o.is_empty()) else {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "no product data provided",
        ));
    };

    let payload = passthrough_payload(fields);
    let created = state
        .shopify
        .create_product_raw(&payload)
        .await
        .map_err(|e| map_shopify_error(req_id.0, &e))?;

    tracing::info!(
        product_id = created["product"]["id"].as_u64(),
        "created Shopify product from frontend payload"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// Maps the frontend's field names onto a `products.json` payload.
pub(super) fn passthrough_payload(fields: &Map<String, Value>) -> Value {
    let field = |key: &str| fields.get(key).cloned().unwrap_or(Value::Null);
    let or_empty_list = |key: &str| fields.get(key).cloned().unwrap_or_else(|| json!([]));
    json!({
        "product": {
            "title": field("title"),
            "body_html": field("description"),
            "vendor": field("vendor"),
            "product_type": field("product_type"),
            "tags": or_empty_list("tags"),
            "variants": or_empty_list("variants"),
        }
    })
}

/// One validated entry of a batch-create request.
#[derive(Debug, PartialEq)]
pub(super) struct BatchItem {
    pub product_id: u64,
    pub category_path: String,
}

/// Validates a raw batch entry, returning the per-item error message on
/// failure.
pub(super) fn parse_batch_item(raw: &Value) -> Result<BatchItem, (Value, &'static str)> {
    let raw_id = raw.get("productID").cloned().unwrap_or(Value::Null);
    let id_text = match &raw_id {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    };
    if id_text.is_empty() || !id_text.bytes().all(|b| b.is_ascii_digit()) {
        return Err((raw_id, NOT_A_NUMBER));
    }

    let category_path = raw
        .get("category_path")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or((raw_id.clone(), "category_path must be a non-empty string"))?;

    let product_id = id_text
        .parse::<i64>()
        .ok()
        .and_then(positive_id)
        .ok_or((raw_id, NOT_POSITIVE))?;

    Ok(BatchItem {
        product_id,
        category_path: category_path.to_owned(),
    })
}

/// Draft listing for a source product, tagged with the storefront category
/// chosen in the frontend.
pub(super) fn new_product_from_source(
    product: &SourceProduct,
    category_path: &str,
    margin: Decimal,
) -> NewProduct {
    let cost = product.price.price;
    NewProduct {
        title: product.title.clone(),
        body_html: non_blank(product.body.as_deref())
            .or_else(|| non_blank(product.description.as_deref()))
            .map(ToOwned::to_owned),
        vendor: product.brand().map(ToOwned::to_owned),
        product_type: product.product_type.clone(),
        tags: category_tags(category_path, product.brand()).join(", "),
        status: ProductStatus::Draft,
        variants: vec![NewVariant {
            price: apply_margin(cost, margin),
            cost,
            sku: product.variant_sku().map(ToOwned::to_owned),
            barcode: product.barcode().map(ToOwned::to_owned),
            inventory_management: "shopify".to_owned(),
            inventory_quantity: product.stock(),
        }],
        images: product
            .image_urls()
            .into_iter()
            .map(|src| NewImage {
                src: src.to_owned(),
            })
            .collect(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Creates up to [`MAX_BATCH`] source products in Shopify as drafts and
/// links each to its source id. Every entry gets its own result.
pub(super) async fn create_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let data = json_body(&req_id, body)?;
    let Some(items) = data.as_array() else {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "expected a list of objects with productID and category_path",
        ));
    };
    if items.len() > MAX_BATCH {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            format!("at most {MAX_BATCH} products can be created at once"),
        ));
    }

    let delay = Duration::from_millis(state.config.shopify_request_delay_ms);
    let mut results = Vec::with_capacity(items.len());

    for (index, raw) in items.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let result = match parse_batch_item(raw) {
            Ok(item) => create_one(&state, &req_id, &item).await,
            Err((raw_id, message)) => {
                json!({ "pc_service_product_id": raw_id, "status": "error", "message": message })
            }
        };
        results.push(result);
    }

    Ok(Json(json!({ "results": results })))
}

async fn create_one(state: &AppState, req_id: &RequestId, item: &BatchItem) -> Value {
    let product_id = item.product_id;
    let product = match state.source.product(product_id).await {
        Ok(product) => product,
        Err(e) => {
            tracing::warn!(request_id = %req_id.0, product_id, error = %e, "source lookup failed");
            return json!({
                "pc_service_product_id": product_id,
                "status": "error",
                "message": source_error_message(&e),
            });
        }
    };

    let new_product =
        new_product_from_source(&product, &item.category_path, state.config.product_margin);
    let response = match state
        .shopify
        .create_product_raw(&json!({ "product": new_product }))
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %req_id.0,
                product_id,
                error = %e,
                "Shopify create failed"
            );
            let mut result = json!({
                "pc_service_product_id": product_id,
                "status": "error",
                "message": e.to_string(),
            });
            if let Some(errors) = e.upstream_body().and_then(|b| b.get("errors").cloned()) {
                result["errors"] = errors;
            }
            return result;
        }
    };

    let Some(shopify_product_id) = response["product"]["id"].as_u64() else {
        tracing::error!(request_id = %req_id.0, product_id, "create response has no product id");
        return json!({
            "pc_service_product_id": product_id,
            "status": "error",
            "message": "Shopify response did not include a product id",
            "response": response,
        });
    };

    let metafields_assigned = match state
        .shopify
        .assign_source_metafields(shopify_product_id, product_id, &state.config.supplier_name)
        .await
    {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(
                request_id = %req_id.0,
                product_id,
                shopify_product_id,
                error = %e,
                "created product but could not link it to its source id"
            );
            false
        }
    };

    tracing::info!(product_id, shopify_product_id, "created Shopify draft from source product");
    json!({
        "pc_service_product_id": product_id,
        "status": "success",
        "shopify_product_id": shopify_product_id,
        "metafields_assigned": metafields_assigned,
        "response": response,
    })
}
