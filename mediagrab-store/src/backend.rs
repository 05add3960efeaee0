//! Raw key-value backend with per-key expiry.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// Key-value store with per-key TTL. The TTL is refreshed on every write;
/// expiry is the only cleanup mechanism — there is no explicit delete path.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Write `value` under `key`, (re)arming its expiry to `ttl` from now.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;

    /// Read the live value under `key`; expired entries are absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}
