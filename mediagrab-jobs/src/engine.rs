//! Media engine abstraction.
//!
//! The executor drives jobs through this trait so tests can substitute a
//! scripted engine for the real yt-dlp/ffmpeg pair.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use mediagrab_queue::OutputKind;

/// Everything the engine needs to fetch one job's media.
#[derive(Debug, Clone)]
pub struct FetchSpec {
    pub job_id: Uuid,
    pub source_url: String,
    pub output_kind: OutputKind,
    /// Requested video quality, e.g. `"720p"`. Ignored for audio jobs.
    pub quality: Option<String>,
    /// Target audio bitrate in kbps. Ignored for video jobs.
    pub bitrate: u32,
    /// Per-job scratch directory the engine writes into.
    pub work_dir: PathBuf,
}

/// Coarse progress events emitted while a fetch runs. The executor maps
/// these onto stages and percentages; the engine only reports what it saw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    /// Transfer progress as a fraction in `[0.0, 1.0]`.
    Transfer(f64),
    /// The downloader committed to an output file.
    Destination,
    /// A post-processing step (merge, extract) started.
    Postprocess,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("required external tool not found: {0}")]
    ToolMissing(String),

    #[error("failed to spawn {tool}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with code {code}: {diagnostic}")]
    Exited {
        tool: String,
        code: i32,
        diagnostic: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fetch-and-transcode backend. Implementations must be safe to share
/// across jobs; per-job state travels in the [`FetchSpec`].
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Verify the external tools are present before accepting work.
    async fn resolve_tools(&self) -> Result<(), EngineError>;

    /// Fetch the source media into `spec.work_dir`, streaming progress
    /// events into `events`. Event send failures are ignored; a dropped
    /// receiver only loses progress granularity, not correctness.
    async fn fetch(
        &self,
        spec: FetchSpec,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<(), EngineError>;

    /// Transcode `input` into an mp3 at `output` with the given bitrate.
    async fn transcode_audio(
        &self,
        input: &Path,
        output: &Path,
        bitrate: u32,
    ) -> Result<(), EngineError>;
}
