//! Typed facade over the raw backend.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::backend::StoreBackend;
use crate::error::StoreError;
use crate::record::ProgressRecord;

/// Metadata store key for a job's progress snapshot.
pub fn meta_key(id: Uuid) -> String {
    format!("job:{id}:meta")
}

/// Job metadata store: serializes [`ProgressRecord`]s under `job:{id}:meta`
/// with a TTL refreshed on every write.
#[derive(Clone)]
pub struct MetaStore {
    backend: Arc<dyn StoreBackend>,
    ttl: Duration,
}

impl MetaStore {
    pub fn new(backend: Arc<dyn StoreBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    /// Persist a job's snapshot, re-arming its expiry.
    pub async fn write(&self, id: Uuid, record: &ProgressRecord) -> Result<(), StoreError> {
        let payload = serde_json::to_string(record)?;
        self.backend.put(&meta_key(id), payload, self.ttl).await
    }

    /// Read a job's live snapshot, if any.
    pub async fn read(&self, id: Uuid) -> Result<Option<ProgressRecord>, StoreError> {
        match self.backend.get(&meta_key(id)).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(record) => Ok(Some(record)),
                Err(e) => {
                    // A corrupt record is treated as absent rather than
                    // poisoning every poll for this job.
                    tracing::warn!(job_id = %id, %e, "discarding unparseable metadata record");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }
}
