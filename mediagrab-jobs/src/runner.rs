//! Worker loop.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use mediagrab_queue::JobQueue;

use crate::download::DownloadExecutor;

/// Drain the queue until it closes. Jobs run strictly one at a time;
/// backend errors are logged and retried after a short pause so a transient
/// Redis hiccup does not kill the worker.
pub async fn run_worker(queue: Arc<dyn JobQueue>, executor: Arc<DownloadExecutor>) {
    info!("worker started");
    loop {
        match queue.dequeue().await {
            Ok(Some(descriptor)) => executor.execute(descriptor).await,
            Ok(None) => break,
            Err(err) => {
                error!(error = %err, "dequeue failed");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
    info!("worker stopped");
}
