use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use mediagrab_queue::{JobDescriptor, JobStatus, OutputKind, DEFAULT_VIDEO_QUALITY};
use mediagrab_store::ProgressRecord;

use crate::handlers::jobs::dto::{SubmitJobRequest, SubmitJobResponse};
use crate::validation::{self, ValidationIssue};
use crate::{error::ApiError, state::AppState};

/// POST /jobs
/// Validate a submission, record it as queued, and enqueue it.
pub async fn create(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<SubmitJobRequest>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiError> {
    let mut issues = validation::validate_submission(
        &body.url,
        body.quality.as_deref(),
        body.bitrate,
        &state.allowed_domains,
    );
    if body.format.is_none() {
        issues.push(ValidationIssue::new(
            "type",
            "required",
            "type must be mp4 or mp3",
        ));
    }
    if !issues.is_empty() {
        return Err(ApiError::Validation(validation::to_payload(&issues)));
    }

    let Some(output_kind) = body.format else {
        return Err(ApiError::bad_request("type must be mp4 or mp3"));
    };
    let quality = match output_kind {
        OutputKind::Video => body
            .quality
            .or_else(|| Some(DEFAULT_VIDEO_QUALITY.to_string())),
        OutputKind::Audio => None,
    };
    let descriptor = JobDescriptor::new(body.url, output_kind, quality, body.bitrate);
    let job_id = descriptor.id;

    // Queued record first so a status poll racing the enqueue still sees
    // the job.
    state.store.write(job_id, &ProgressRecord::queued()).await?;
    state.queue.enqueue(descriptor).await?;

    info!(%job_id, "job accepted");
    Ok((
        StatusCode::CREATED,
        Json(SubmitJobResponse {
            job_id,
            status: JobStatus::Queued,
        }),
    ))
}
