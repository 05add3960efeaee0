//! Mediagrab backend server.
//!
//! Entry point: configuration loading, queue and store wiring, and HTTP
//! server startup. With the in-memory queue backend a single worker runs
//! inside this process; with the Redis backend, workers run separately as
//! `mediagrab-worker` processes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use mediagrab_backend::app::{build_router, cors_layer};
use mediagrab_backend::state::AppState;
use mediagrab_jobs::{run_worker, DownloadExecutor, YtDlpEngine};
use mediagrab_queue::{JobQueue, MemoryQueue, RedisQueue};
use mediagrab_store::{MemoryBackend, MetaStore, RedisBackend, StoreBackend};

mod cli;
mod tracing_setup;

use cli::CliArgs;
use tracing_setup::install_tracing_from_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.help_requested {
        CliArgs::print_help();
        return Ok(());
    }

    // Resolve config path: CLI > environment variable
    let config_path = args
        .config_path
        .or_else(|| std::env::var("MEDIAGRAB_CONFIG_PATH").ok());
    let config = mediagrab_config::load_config(config_path.as_deref())?;
    mediagrab_config::validate_config(&config)?;

    install_tracing_from_config(&config.logging);

    let storage_root = PathBuf::from(&config.storage.root);
    tokio::fs::create_dir_all(&storage_root).await?;

    let ttl = Duration::from_secs(config.meta.ttl_seconds);

    // The metadata store follows the queue backend: in-process jobs keep
    // their records in-process, external workers need them in Redis.
    let (queue, store_backend): (Arc<dyn JobQueue>, Arc<dyn StoreBackend>) =
        match config.queue.backend.as_str() {
            "redis" => {
                let url = config
                    .queue
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("queue.redis_url is required"))?;
                let queue =
                    RedisQueue::connect(url, &config.queue.key, config.meta.ttl_seconds).await?;
                let backend = RedisBackend::connect(url).await?;
                (Arc::new(queue), Arc::new(backend))
            }
            _ => (MemoryQueue::shared(), Arc::new(MemoryBackend::new())),
        };

    let store = MetaStore::new(store_backend, ttl);

    let worker_handle = if config.queue.backend == "memory" {
        let engine = Arc::new(YtDlpEngine::new(
            config.media.ytdlp_path.clone(),
            config.media.ffmpeg_path.clone(),
        ));
        let executor = Arc::new(DownloadExecutor::new(
            store.clone(),
            Arc::clone(&queue),
            engine,
            storage_root.clone(),
        ));
        Some(tokio::spawn(run_worker(Arc::clone(&queue), executor)))
    } else {
        None
    };

    let state = Arc::new(AppState::new(
        Arc::clone(&queue),
        store,
        config.media.allowed_domains.clone(),
        storage_root,
        config.queue.backend.clone(),
    ));
    let router = build_router(state, cors_layer(&config.cors));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, backend = %config.queue.backend, "server listening");

    let shutdown_queue = Arc::clone(&queue);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            shutdown_queue.close();
        })
        .await?;

    if let Some(handle) = worker_handle {
        // The close above wakes the worker; let it finish its current job.
        let _ = handle.await;
    }
    tracing::info!("server stopped");
    Ok(())
}
