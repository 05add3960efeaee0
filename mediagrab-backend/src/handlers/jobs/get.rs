use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// GET /jobs/{jobId}
/// Return the job's metadata record, falling back to the queue's native
/// status when the record has expired. 404 only when both are silent.
pub async fn get(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let job_id = parse_job_id(&path)?;

    if let Some(record) = state.store.read(job_id).await? {
        let mut value = serde_json::to_value(&record)?;
        if let Some(map) = value.as_object_mut() {
            map.insert("jobId".to_string(), json!(job_id));
        }
        return Ok(Json(value));
    }

    match state.queue.fetch_status(job_id).await? {
        Some(run) => Ok(Json(json!({
            "jobId": job_id,
            "status": run.status,
            "error": run.error_message,
        }))),
        None => Err(ApiError::not_found(format!("unknown job {job_id}"))),
    }
}

pub(crate) fn parse_job_id(path: &HashMap<String, String>) -> Result<Uuid, ApiError> {
    let raw = path
        .get("jobId")
        .ok_or_else(|| ApiError::bad_request("missing jobId path parameter"))?;
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("invalid job id {raw}")))
}
