//! TTL-bound job metadata store.
//!
//! Workers publish [`ProgressRecord`] snapshots here; the status service
//! polls them. Every write refreshes the record's TTL, and expiry is the
//! only cleanup mechanism.
//!
//! # Architecture
//!
//! - [`StoreBackend`] - Raw key-value interface with per-key expiry
//! - [`MemoryBackend`] - Map-backed store for single-process deployments
//!   and tests
//! - [`RedisBackend`] - Shared store for separate API/worker processes
//! - [`MetaStore`] - Typed facade owning key layout and serialization

mod backend;
mod error;
mod memory;
mod record;
mod redis;
mod store;

pub use backend::StoreBackend;
pub use error::StoreError;
pub use memory::MemoryBackend;
pub use record::{ProgressRecord, ResultRecord};
pub use self::redis::RedisBackend;
pub use store::{meta_key, MetaStore};
