//! FIFO job queue abstraction used by the mediagrab backend and workers.
//!
//! This crate defines the job descriptor that travels from the submission
//! service to a worker, the coarse queue-native status record, and two
//! interchangeable queue backends.
//!
//! # Architecture
//!
//! - [`JobQueue`] - The queue interface: enqueue, blocking FIFO dequeue,
//!   native status fallback
//! - [`JobDescriptor`] - The entity flowing through the queue
//! - [`MemoryQueue`] - Channel-backed queue for single-process deployments
//! - [`RedisQueue`] - List-backed queue for separate worker processes
//!
//! # Example
//!
//! ```rust,no_run
//! use mediagrab_queue::{JobDescriptor, JobQueue, MemoryQueue, OutputKind};
//!
//! #[tokio::main]
//! async fn main() {
//!     let queue = MemoryQueue::shared();
//!
//!     let descriptor = JobDescriptor::new(
//!         "https://youtu.be/dQw4w9WgXcQ",
//!         OutputKind::Audio,
//!         None,
//!         Some(192),
//!     );
//!     let id = descriptor.id;
//!     queue.enqueue(descriptor).await.unwrap();
//!     println!("enqueued job: {id}");
//! }
//! ```

mod error;
mod memory;
mod queue;
mod redis;
mod types;

pub use error::QueueError;
pub use memory::MemoryQueue;
pub use queue::JobQueue;
pub use self::redis::RedisQueue;
pub use types::{
    JobDescriptor, JobRun, JobStatus, OutputKind, Stage, DEFAULT_AUDIO_BITRATE,
    DEFAULT_VIDEO_QUALITY,
};

// Re-export async_trait for convenience when implementing JobQueue
pub use async_trait::async_trait;
