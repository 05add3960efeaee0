use std::path::PathBuf;
use std::sync::Arc;

use mediagrab_queue::JobQueue;
use mediagrab_store::MetaStore;

/// Shared application state passed to every route handler.
pub struct AppState {
    pub queue: Arc<dyn JobQueue>,
    pub store: MetaStore,
    /// Hosts accepted by the submission endpoint.
    pub allowed_domains: Vec<String>,
    pub storage_root: PathBuf,
    /// Name of the configured queue backend, surfaced by `/queue/info`.
    pub queue_backend: String,
}

impl AppState {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        store: MetaStore,
        allowed_domains: Vec<String>,
        storage_root: PathBuf,
        queue_backend: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            store,
            allowed_domains,
            storage_root,
            queue_backend: queue_backend.into(),
        }
    }
}
