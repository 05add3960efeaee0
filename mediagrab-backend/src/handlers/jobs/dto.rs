use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mediagrab_queue::{JobStatus, OutputKind};

/// Request body for `POST /jobs`.
#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub url: String,
    /// Requested output container, `mp4` or `mp3`. Required; absence is
    /// reported as a validation issue rather than a deserialization error.
    #[serde(default, rename = "type")]
    pub format: Option<OutputKind>,
    /// Video resolution cap, e.g. `720p`.
    #[serde(default)]
    pub quality: Option<String>,
    /// Audio bitrate in kbps.
    #[serde(default)]
    pub bitrate: Option<u32>,
}

/// Response body for `POST /jobs`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}
