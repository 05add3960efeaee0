//! In-process store backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::backend::StoreBackend;
use crate::error::StoreError;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Map-backed store with lazy expiry: entries past their deadline are
/// evicted on lookup.
#[derive(Default)]
pub struct MemoryBackend {
    entries: DashMap<String, Entry>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if entry.expires_at > Instant::now() {
                    return Ok(Some(entry.value.clone()));
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }
}
