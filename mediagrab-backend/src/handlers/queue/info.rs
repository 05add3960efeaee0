use std::sync::Arc;

use axum::extract::Extension;
use axum::Json;
use serde_json::{json, Value};

use crate::{error::ApiError, state::AppState};

/// GET /queue/info
/// Report the configured backend and current queue depth.
pub async fn info(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let pending = state.queue.pending().await?;
    Ok(Json(json!({
        "backend": state.queue_backend,
        "pending": pending,
    })))
}
