//! Error types for the job queue.

use thiserror::Error;

/// Errors that may occur while interacting with the job queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("job queue is shut down")]
    Closed,

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("descriptor serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
