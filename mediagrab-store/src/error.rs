//! Error types for the metadata store.

use thiserror::Error;

/// Errors that may occur while reading or writing job metadata.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
