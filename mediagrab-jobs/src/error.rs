//! Job execution errors.

use thiserror::Error;

use crate::engine::EngineError;
use crate::state::StateError;
use mediagrab_store::StoreError;

/// Errors that may occur while driving one job to a terminal state. Every
/// variant is caught at the job boundary and converted into a terminal
/// `Failed` metadata record.
#[derive(Debug, Error)]
pub enum JobError {
    /// The environment is missing something the worker needs, e.g. the
    /// external tool binaries.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The external engine ran but did not produce a usable result.
    #[error("execution error: {0}")]
    Execution(String),

    #[error("metadata store error: {0}")]
    Store(#[from] StoreError),

    #[error("state machine violation: {0}")]
    State(#[from] StateError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EngineError> for JobError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::ToolMissing(_) => Self::Configuration(e.to_string()),
            other => Self::Execution(other.to_string()),
        }
    }
}
