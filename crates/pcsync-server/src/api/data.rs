use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Local;
use pcsync_sync::{parse_snapshot_date, read_snapshot_records, snapshot_path, SyncError};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{ApiError, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct DataQuery {
    date: Option<String>,
}

/// Serves a staged snapshot as a list of records, one object per row.
/// Defaults to today's snapshot.
pub(super) async fn snapshot_records(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<DataQuery>,
) -> Result<Json<Vec<Map<String, Value>>>, ApiError> {
    let date = match query.date.as_deref() {
        Some(raw) => parse_snapshot_date(raw).ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "bad_request",
                format!("invalid date \"{raw}\", expected DD_MM_YYYY"),
            )
        })?,
        None => Local::now().date_naive(),
    };

    let path = snapshot_path(&state.config.staging_dir, date);
    tracing::debug!(path = %path.display(), "serving snapshot");

    match read_snapshot_records(&path) {
        Ok(records) => Ok(Json(records)),
        Err(SyncError::SnapshotMissing { .. }) => {
            Err(ApiError::new(req_id.0, "not_found", "file not found"))
        }
        Err(e) => {
            tracing::error!(
                request_id = %req_id.0,
                path = %path.display(),
                error = %e,
                "failed to read snapshot"
            );
            Err(ApiError::new(
                req_id.0,
                "internal_error",
                format!("failed to process file: {e}"),
            ))
        }
    }
}
