//! Queue trait shared by the memory and Redis backends.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::QueueError;
use crate::types::{JobDescriptor, JobRun, JobStatus};

/// Durable FIFO work queue.
///
/// Producers enqueue opaque job descriptors; a single consumer dequeues and
/// executes each descriptor exactly once. `dequeue` never fails on an empty
/// queue — it suspends the calling worker until work arrives, and yields
/// `None` only when the queue has been shut down.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Push a descriptor onto the tail of the queue and record its native
    /// `Queued` status.
    async fn enqueue(&self, descriptor: JobDescriptor) -> Result<(), QueueError>;

    /// Pop the descriptor at the head of the queue, suspending while the
    /// queue is empty. Returns `Ok(None)` on shutdown.
    async fn dequeue(&self) -> Result<Option<JobDescriptor>, QueueError>;

    /// Queue-native coarse status, used by the status service as a fallback
    /// when the metadata record has expired or not yet been written.
    async fn fetch_status(&self, id: Uuid) -> Result<Option<JobRun>, QueueError>;

    /// Update the queue-native status record. Called only by the worker.
    async fn mark_status(
        &self,
        id: Uuid,
        status: JobStatus,
        error_message: Option<String>,
    ) -> Result<(), QueueError>;

    /// Number of descriptors waiting to be dequeued.
    async fn pending(&self) -> Result<usize, QueueError>;

    /// Signal shutdown: blocked consumers wake with `None`, further
    /// enqueues are refused.
    fn close(&self);
}
