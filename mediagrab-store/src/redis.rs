//! Redis store backend.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::backend::StoreBackend;
use crate::error::StoreError;

/// Store backend over a shared Redis instance; `SET ... EX` arms the expiry
/// on every write.
pub struct RedisBackend {
    conn: MultiplexedConnection,
}

impl RedisBackend {
    /// Connect to the store backend.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl StoreBackend for RedisBackend {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        // Sub-second TTLs only occur in tests; Redis expiry granularity here
        // is whole seconds.
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, seconds).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }
}
