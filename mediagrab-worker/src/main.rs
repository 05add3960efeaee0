//! Standalone worker process for the Redis queue backend.
//!
//! Connects to the same Redis instance as the backend server, pops
//! descriptors, and runs them one at a time. Multiple worker processes may
//! run against the same queue; BRPOP hands each job to exactly one of them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mediagrab_jobs::{run_worker, DownloadExecutor, YtDlpEngine};
use mediagrab_queue::{JobQueue, RedisQueue};
use mediagrab_store::{MetaStore, RedisBackend};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("MEDIAGRAB_CONFIG_PATH").ok();
    let config = mediagrab_config::load_config(config_path.as_deref())?;
    mediagrab_config::validate_config(&config)?;

    let env_filter_str =
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone());
    let env_filter = tracing_subscriber::EnvFilter::new(&env_filter_str);
    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
            .finish()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .finish()
            .init();
    }

    if config.queue.backend != "redis" {
        anyhow::bail!("the standalone worker requires queue.backend = \"redis\"");
    }
    let url = config
        .queue
        .redis_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("queue.redis_url is required"))?;

    let storage_root = PathBuf::from(&config.storage.root);
    tokio::fs::create_dir_all(&storage_root).await?;

    let queue: Arc<dyn JobQueue> = Arc::new(
        RedisQueue::connect(url, &config.queue.key, config.meta.ttl_seconds).await?,
    );
    let store = MetaStore::new(
        Arc::new(RedisBackend::connect(url).await?),
        Duration::from_secs(config.meta.ttl_seconds),
    );
    let engine = Arc::new(YtDlpEngine::new(
        config.media.ytdlp_path.clone(),
        config.media.ffmpeg_path.clone(),
    ));
    let executor = Arc::new(DownloadExecutor::new(
        store,
        Arc::clone(&queue),
        engine,
        storage_root,
    ));

    tracing::info!(queue_key = %config.queue.key, "worker connecting");

    let shutdown_queue = Arc::clone(&queue);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
        shutdown_queue.close();
    });

    run_worker(queue, executor).await;
    Ok(())
}
