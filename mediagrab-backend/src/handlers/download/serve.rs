use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Extension, Path};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use tokio_util::io::ReaderStream;
use tracing::warn;

use mediagrab_queue::JobStatus;

use crate::handlers::jobs::get::parse_job_id;
use crate::{error::ApiError, state::AppState};

/// GET /download/{jobId}
/// Stream a finished job's artifact. Unfinished jobs get 409, unknown jobs
/// 404, and a finished job whose file has vanished 500.
pub async fn serve(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let job_id = parse_job_id(&path)?;

    let record = match state.store.read(job_id).await? {
        Some(record) => record,
        None => {
            // Metadata expired; the queue's run log can still distinguish
            // an in-flight job from an unknown one.
            return match state.queue.fetch_status(job_id).await? {
                Some(run) if !run.status.is_terminal() => {
                    Err(ApiError::conflict(format!("job {job_id} is not finished")))
                }
                Some(_) => Err(ApiError::not_found(format!(
                    "result for job {job_id} has expired"
                ))),
                None => Err(ApiError::not_found(format!("unknown job {job_id}"))),
            };
        }
    };

    if record.status != JobStatus::Finished {
        return Err(ApiError::conflict(format!(
            "job {job_id} is not finished (status {})",
            record.status
        )));
    }

    let result = record.result().ok_or_else(|| {
        ApiError::Unexpected(format!("finished job {job_id} has no result fields"))
    })?;

    let file = tokio::fs::File::open(&result.file_path).await.map_err(|err| {
        warn!(%job_id, path = %result.file_path, error = %err, "result file missing");
        ApiError::Unexpected(format!("result file for job {job_id} no longer exists"))
    })?;

    let content_type = mime_guess::from_path(FsPath::new(&result.file_name))
        .first_or_octet_stream()
        .to_string();
    let disposition = format!(
        "attachment; filename=\"{}\"",
        result.file_name.replace('"', "")
    );

    let body = Body::from_stream(ReaderStream::new(file));
    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
        )
        .header(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&disposition)
                .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
        )
        .body(body)
        .map_err(|err| ApiError::Unexpected(err.to_string()))
}
