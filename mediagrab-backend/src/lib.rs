//! HTTP API for the media fetch service.
//!
//! Routes:
//! - `POST /jobs` submits a fetch job
//! - `GET /jobs/{jobId}` returns job progress
//! - `GET /download/{jobId}` streams a finished artifact
//! - `GET /queue/info` reports queue depth
//! - `GET /health` liveness probe

pub mod app;
pub mod error;
pub mod handlers;
pub mod state;
pub mod validation;
