use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mediagrab_backend::state::AppState;
use mediagrab_queue::MemoryQueue;
use mediagrab_store::{MemoryBackend, MetaStore};

pub struct TestEnv {
    pub state: Arc<AppState>,
    pub queue: Arc<MemoryQueue>,
    pub store: MetaStore,
    pub storage_root: tempfile::TempDir,
}

/// In-memory state container with the default youtube allow-list.
pub fn test_env() -> TestEnv {
    let storage_root = tempfile::tempdir().expect("tempdir");
    let queue = MemoryQueue::shared();
    let store = MetaStore::new(Arc::new(MemoryBackend::new()), Duration::from_secs(60));
    let state = Arc::new(AppState::new(
        queue.clone(),
        store.clone(),
        vec![
            "www.youtube.com".to_string(),
            "youtube.com".to_string(),
            "m.youtube.com".to_string(),
            "youtu.be".to_string(),
        ],
        PathBuf::from(storage_root.path()),
        "memory",
    ));
    TestEnv {
        state,
        queue,
        store,
        storage_root,
    }
}
