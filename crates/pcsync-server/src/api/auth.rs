use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use super::{json_body, ApiError, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
pub(super) struct LoginResponse {
    message: &'static str,
}

/// Checks the admin credentials. No session or token is issued.
pub(super) async fn login(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let request = json_body(&req_id, body)?;

    let Some(admin) = state.config.admin.as_ref() else {
        tracing::warn!("login attempted but ADMIN_USERNAME/ADMIN_PASSWORD are not configured");
        return Err(invalid_credentials(req_id));
    };

    let username_ok = request.username.as_bytes().ct_eq(admin.username.as_bytes());
    let password_ok = request.password.as_bytes().ct_eq(admin.password.as_bytes());
    if bool::from(username_ok & password_ok) {
        tracing::info!(username = %request.username, "admin login succeeded");
        Ok(Json(LoginResponse {
            message: "Login successful",
        }))
    } else {
        tracing::warn!(username = %request.username, "admin login rejected");
        Err(invalid_credentials(req_id))
    }
}

fn invalid_credentials(req_id: RequestId) -> ApiError {
    ApiError::new(req_id.0, "unauthorized", "invalid username or password")
}
