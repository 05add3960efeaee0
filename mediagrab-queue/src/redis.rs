//! Redis-backed queue.
//!
//! Descriptors are `LPUSH`ed onto a list and consumed with blocking `BRPOP`,
//! which gives strict arrival order and at-most-one delivery per descriptor
//! across any number of worker processes. The queue-native status record
//! lives at `job:{id}:status` with the same TTL discipline as the metadata
//! store.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::error::QueueError;
use crate::queue::JobQueue;
use crate::types::{JobDescriptor, JobRun, JobStatus};

/// Upper bound on one BRPOP wait; the consumer re-checks shutdown between
/// waits, so this is also the worst-case shutdown latency.
const BLOCK_SECONDS: f64 = 5.0;

fn status_key(id: &Uuid) -> String {
    format!("job:{id}:status")
}

/// FIFO queue over a Redis list, shared by separate producer and consumer
/// processes.
pub struct RedisQueue {
    conn: MultiplexedConnection,
    queue_key: String,
    status_ttl: u64,
    shutdown: CancellationToken,
}

impl RedisQueue {
    /// Connect to the queue backend.
    pub async fn connect(
        url: &str,
        queue_key: impl Into<String>,
        status_ttl: u64,
    ) -> Result<Self, QueueError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            queue_key: queue_key.into(),
            status_ttl,
            shutdown: CancellationToken::new(),
        })
    }

    async fn write_run(&self, run: &JobRun) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(run)?;
        let _: () = conn
            .set_ex(status_key(&run.id), payload, self.status_ttl)
            .await?;
        Ok(())
    }

    async fn read_run(&self, id: &Uuid) -> Result<Option<JobRun>, QueueError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(status_key(id)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn enqueue(&self, descriptor: JobDescriptor) -> Result<(), QueueError> {
        if self.shutdown.is_cancelled() {
            return Err(QueueError::Closed);
        }

        self.write_run(&JobRun::new(descriptor.id)).await?;

        let payload = serde_json::to_string(&descriptor)?;
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(&self.queue_key, payload).await?;
        debug!(job_id = %descriptor.id, key = %self.queue_key, "descriptor enqueued");
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<JobDescriptor>, QueueError> {
        loop {
            if self.shutdown.is_cancelled() {
                return Ok(None);
            }

            let mut conn = self.conn.clone();
            let popped: Option<(String, String)> =
                conn.brpop(&self.queue_key, BLOCK_SECONDS).await?;

            match popped {
                Some((_, payload)) => {
                    let descriptor: JobDescriptor = serde_json::from_str(&payload)?;
                    debug!(job_id = %descriptor.id, "descriptor dequeued");
                    return Ok(Some(descriptor));
                }
                // Timed out waiting, go around and re-check shutdown.
                None => continue,
            }
        }
    }

    async fn fetch_status(&self, id: Uuid) -> Result<Option<JobRun>, QueueError> {
        self.read_run(&id).await
    }

    async fn mark_status(
        &self,
        id: Uuid,
        status: JobStatus,
        error_message: Option<String>,
    ) -> Result<(), QueueError> {
        let mut run = self.read_run(&id).await?.unwrap_or_else(|| JobRun::new(id));
        run.mark(status, error_message);
        self.write_run(&run).await
    }

    async fn pending(&self) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        let len: usize = conn.llen(&self.queue_key).await?;
        Ok(len)
    }

    fn close(&self) {
        self.shutdown.cancel();
    }
}
