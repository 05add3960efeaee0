//! In-process queue backend.
//!
//! Producer and consumer share one process: the submission service pushes
//! descriptors into an unbounded channel and a single in-process worker task
//! pulls them out in arrival order.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::QueueError;
use crate::queue::JobQueue;
use crate::types::{JobDescriptor, JobRun, JobStatus};

/// Maximum number of job runs to keep in memory.
const MAX_JOB_RUNS: usize = 1000;

/// Native status records, optimized for both insertion order and lookup by id.
#[derive(Debug, Default)]
struct RunLog {
    /// Ordered list of job run ids (oldest first).
    order: VecDeque<Uuid>,
    /// Map from id to job run for O(1) lookup.
    runs: HashMap<Uuid, JobRun>,
}

impl RunLog {
    /// Insert a new job run, maintaining the size limit.
    fn insert(&mut self, run: JobRun) {
        let id = run.id;
        self.runs.insert(id, run);
        self.order.push_back(id);

        // Trim old runs if we exceed the limit
        while self.order.len() > MAX_JOB_RUNS {
            if let Some(old_id) = self.order.pop_front() {
                self.runs.remove(&old_id);
            }
        }
    }

    #[inline]
    fn get(&self, id: &Uuid) -> Option<&JobRun> {
        self.runs.get(id)
    }

    #[inline]
    fn get_mut(&mut self, id: &Uuid) -> Option<&mut JobRun> {
        self.runs.get_mut(id)
    }
}

/// FIFO queue living entirely in process memory.
pub struct MemoryQueue {
    tx: mpsc::UnboundedSender<JobDescriptor>,
    // The receiver sits behind a Mutex so `dequeue` can take `&self`; the
    // single-consumer guarantee is the receiver itself.
    rx: Mutex<mpsc::UnboundedReceiver<JobDescriptor>>,
    runs: RwLock<RunLog>,
    pending: AtomicUsize,
    shutdown: CancellationToken,
}

impl fmt::Debug for MemoryQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryQueue")
            .field("pending", &self.pending.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            runs: RwLock::new(RunLog::default()),
            pending: AtomicUsize::new(0),
            shutdown: CancellationToken::new(),
        }
    }

    /// Shared handle suitable for handing to both producer and consumer.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, descriptor: JobDescriptor) -> Result<(), QueueError> {
        if self.shutdown.is_cancelled() {
            return Err(QueueError::Closed);
        }

        {
            let mut runs = self.runs.write().await;
            runs.insert(JobRun::new(descriptor.id));
        }

        self.tx
            .send(descriptor)
            .map_err(|_| QueueError::Closed)?;
        self.pending.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<JobDescriptor>, QueueError> {
        let mut rx = self.rx.lock().await;
        tokio::select! {
            _ = self.shutdown.cancelled() => Ok(None),
            descriptor = rx.recv() => match descriptor {
                Some(descriptor) => {
                    self.pending.fetch_sub(1, Ordering::Relaxed);
                    Ok(Some(descriptor))
                }
                None => Ok(None),
            },
        }
    }

    async fn fetch_status(&self, id: Uuid) -> Result<Option<JobRun>, QueueError> {
        let runs = self.runs.read().await;
        Ok(runs.get(&id).cloned())
    }

    async fn mark_status(
        &self,
        id: Uuid,
        status: JobStatus,
        error_message: Option<String>,
    ) -> Result<(), QueueError> {
        let mut runs = self.runs.write().await;
        match runs.get_mut(&id) {
            Some(run) => run.mark(status, error_message),
            None => {
                // Run record may have been trimmed; recreate so the fallback
                // read path still answers.
                let mut run = JobRun::new(id);
                run.mark(status, error_message);
                runs.insert(run);
            }
        }
        Ok(())
    }

    async fn pending(&self) -> Result<usize, QueueError> {
        Ok(self.pending.load(Ordering::Relaxed))
    }

    fn close(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutputKind;
    use std::time::Duration;

    fn descriptor(url: &str) -> JobDescriptor {
        JobDescriptor::new(url, OutputKind::Video, Some("720p".to_string()), None)
    }

    #[tokio::test]
    async fn dequeues_in_arrival_order() {
        let queue = MemoryQueue::new();
        let first = descriptor("https://youtu.be/one");
        let second = descriptor("https://youtu.be/two");
        let (a, b) = (first.id, second.id);

        queue.enqueue(first).await.unwrap();
        queue.enqueue(second).await.unwrap();

        assert_eq!(queue.pending().await.unwrap(), 2);
        assert_eq!(queue.dequeue().await.unwrap().unwrap().id, a);
        assert_eq!(queue.dequeue().await.unwrap().unwrap().id, b);
        assert_eq!(queue.pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn enqueue_records_native_queued_status() {
        let queue = MemoryQueue::new();
        let d = descriptor("https://youtu.be/one");
        let id = d.id;
        queue.enqueue(d).await.unwrap();

        let run = queue.fetch_status(id).await.unwrap().unwrap();
        assert_eq!(run.status, JobStatus::Queued);
        assert!(run.error_message.is_none());
    }

    #[tokio::test]
    async fn mark_status_updates_native_record() {
        let queue = MemoryQueue::new();
        let d = descriptor("https://youtu.be/one");
        let id = d.id;
        queue.enqueue(d).await.unwrap();

        queue
            .mark_status(id, JobStatus::Failed, Some("boom".to_string()))
            .await
            .unwrap();
        let run = queue.fetch_status(id).await.unwrap().unwrap();
        assert_eq!(run.status, JobStatus::Failed);
        assert_eq!(run.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn dequeue_blocks_until_work_arrives() {
        let queue = MemoryQueue::shared();

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await })
        };

        // Give the consumer a moment to park on the empty queue.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        let d = descriptor("https://youtu.be/late");
        let id = d.id;
        queue.enqueue(d).await.unwrap();

        let got = consumer.await.unwrap().unwrap().unwrap();
        assert_eq!(got.id, id);
    }

    #[tokio::test]
    async fn close_wakes_blocked_consumer_with_none() {
        let queue = MemoryQueue::shared();
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        queue.close();
        assert!(consumer.await.unwrap().unwrap().is_none());

        // Producers are refused after shutdown.
        let err = queue.enqueue(descriptor("https://youtu.be/x")).await;
        assert!(matches!(err, Err(QueueError::Closed)));
    }

    #[tokio::test]
    async fn fetch_status_unknown_id_is_none() {
        let queue = MemoryQueue::new();
        assert!(queue.fetch_status(Uuid::new_v4()).await.unwrap().is_none());
    }
}
