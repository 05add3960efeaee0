//! Serialized snapshots persisted in the metadata store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mediagrab_queue::{JobStatus, Stage};

/// Result of a finished job: written once by the worker, read many times by
/// the status/result service, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultRecord {
    pub file_name: String,
    /// Absolute path to the artifact inside the job's work directory.
    pub file_path: String,
    pub download_url: String,
}

impl ResultRecord {
    /// Download URL derived deterministically from the job id.
    pub fn download_url_for(id: Uuid) -> String {
        format!("/download/{id}")
    }
}

/// TTL-bound snapshot of a job's current state. This is the sole channel
/// through which the worker communicates with the status service; the two
/// may run as separate processes and share nothing else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub status: JobStatus,
    pub stage: Stage,
    /// Percentage in [0, 100], non-decreasing while running.
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressRecord {
    /// Snapshot seeded by the submission service before enqueue, so a poll
    /// immediately after submission never observes a missing record.
    pub fn queued() -> Self {
        Self {
            status: JobStatus::Queued,
            stage: Stage::Init,
            progress: 0,
            filename: None,
            path: None,
            download_url: None,
            error: None,
        }
    }

    pub fn running(stage: Stage, progress: u8) -> Self {
        Self {
            status: JobStatus::Running,
            stage,
            progress,
            filename: None,
            path: None,
            download_url: None,
            error: None,
        }
    }

    /// Terminal success snapshot; always carries the result record.
    pub fn finished(result: &ResultRecord) -> Self {
        Self {
            status: JobStatus::Finished,
            stage: Stage::Finalizing,
            progress: 100,
            filename: Some(result.file_name.clone()),
            path: Some(result.file_path.clone()),
            download_url: Some(result.download_url.clone()),
            error: None,
        }
    }

    /// Terminal failure snapshot; progress resets to 0 and the error text is
    /// always non-empty.
    pub fn failed(stage: Stage, error: impl Into<String>) -> Self {
        let error = error.into();
        debug_assert!(!error.is_empty());
        Self {
            status: JobStatus::Failed,
            stage,
            progress: 0,
            filename: None,
            path: None,
            download_url: None,
            error: Some(error),
        }
    }

    /// Extract the result record from a finished snapshot.
    pub fn result(&self) -> Option<ResultRecord> {
        if self.status != JobStatus::Finished {
            return None;
        }
        Some(ResultRecord {
            file_name: self.filename.clone()?,
            file_path: self.path.clone()?,
            download_url: self.download_url.clone()?,
        })
    }
}
