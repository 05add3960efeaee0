//! Core types flowing through the job queue.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audio bitrate (kbps) applied when an audio job carries no hint.
pub const DEFAULT_AUDIO_BITRATE: u32 = 192;

/// Resolution ceiling applied when a video job carries no hint.
pub const DEFAULT_VIDEO_QUALITY: &str = "720p";

/// Requested output artifact kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OutputKind {
    #[serde(rename = "mp4")]
    Video,
    #[serde(rename = "mp3")]
    Audio,
}

impl OutputKind {
    /// File extension of the final artifact container.
    #[inline]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Video => "mp4",
            Self::Audio => "mp3",
        }
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// One media-fetch request travelling from the submission service to a
/// worker. Immutable after enqueue; its fields are copied into the worker's
/// execution context on dequeue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: Uuid,
    pub source_url: String,
    pub output_kind: OutputKind,
    /// Optional resolution ceiling for video jobs, e.g. "720p".
    pub quality: Option<String>,
    /// Optional audio bitrate in kbps for audio jobs.
    pub bitrate: Option<u32>,
}

impl JobDescriptor {
    /// Build a descriptor with a freshly generated job id.
    pub fn new(
        source_url: impl Into<String>,
        output_kind: OutputKind,
        quality: Option<String>,
        bitrate: Option<u32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_url: source_url.into(),
            output_kind,
            quality,
            bitrate,
        }
    }

    /// Per-job work directory, derived deterministically from the job id so
    /// that concurrent jobs never share files.
    pub fn work_dir(&self, storage_root: &Path) -> PathBuf {
        storage_root.join(self.id.to_string())
    }
}

/// Coarse lifecycle status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Finished,
    Failed,
}

impl JobStatus {
    /// Returns true if this status represents a terminal state.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
        })
    }
}

/// Sub-phase of a `Running` job. Ordered: a job only moves forward through
/// these stages.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Init,
    Downloading,
    Postprocessing,
    Finalizing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Downloading => "downloading",
            Self::Postprocessing => "postprocessing",
            Self::Finalizing => "finalizing",
        })
    }
}

/// Queue-native record of a job's coarse lifecycle. This is a fallback read
/// path only; fine-grained progress lives in the metadata store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    pub id: Uuid,
    pub status: JobStatus,
    pub enqueued_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub error_message: Option<String>,
}

impl JobRun {
    /// Create a new queued job run.
    #[inline]
    pub fn new(id: Uuid) -> Self {
        let now = chrono::Utc::now();
        Self {
            id,
            status: JobStatus::Queued,
            enqueued_at: now,
            updated_at: now,
            error_message: None,
        }
    }

    /// Apply a status change, stamping the update time.
    #[inline]
    pub fn mark(&mut self, status: JobStatus, error_message: Option<String>) {
        self.status = status;
        self.updated_at = chrono::Utc::now();
        self.error_message = error_message;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_kind_wire_names() {
        assert_eq!(serde_json::to_string(&OutputKind::Video).unwrap(), "\"mp4\"");
        assert_eq!(serde_json::to_string(&OutputKind::Audio).unwrap(), "\"mp3\"");
        let k: OutputKind = serde_json::from_str("\"mp3\"").unwrap();
        assert_eq!(k, OutputKind::Audio);
    }

    #[test]
    fn work_dir_is_partitioned_by_id() {
        let a = JobDescriptor::new("https://youtu.be/a", OutputKind::Video, None, None);
        let b = JobDescriptor::new("https://youtu.be/a", OutputKind::Audio, None, None);
        let root = Path::new("/srv/storage");
        assert_ne!(a.work_dir(root), b.work_dir(root));
        assert!(a.work_dir(root).starts_with(root));
    }

    #[test]
    fn stage_ordering() {
        assert!(Stage::Init < Stage::Downloading);
        assert!(Stage::Downloading < Stage::Postprocessing);
        assert!(Stage::Postprocessing < Stage::Finalizing);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Finished.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
