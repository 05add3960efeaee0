//! Job execution for the media fetch service.
//!
//! This crate owns everything that happens after a descriptor leaves the
//! queue: the explicit job state machine, progress mapping, the yt-dlp and
//! ffmpeg engine, artifact selection, and the single-job worker loop.
//!
//! # Architecture
//!
//! - [`engine::MediaEngine`] abstracts the external tools so the executor
//!   can be tested with a scripted engine.
//! - [`download::DownloadExecutor`] runs one job to a terminal state and is
//!   the sole writer of that job's metadata record.
//! - [`runner::run_worker`] drains a [`mediagrab_queue::JobQueue`] until it
//!   closes, one job at a time.

pub mod artifact;
pub mod download;
pub mod engine;
pub mod error;
pub mod progress;
pub mod runner;
pub mod state;
pub mod ytdlp;

pub use download::DownloadExecutor;
pub use engine::{EngineError, EngineEvent, FetchSpec, MediaEngine};
pub use error::JobError;
pub use runner::run_worker;
pub use state::{JobState, StateError, StateTracker};
pub use ytdlp::YtDlpEngine;
