//! Coffer Shard Storage
//!
//! Storage abstractions for erasure-coded shards:
//! - `ShardStore` trait for pluggable backends
//! - `LocalShardStore` for on-disk storage
//! - `MemoryShardStore` for testing
//!
//! A shard is addressed by `(object id, shard index, location)`, where the
//! location is an opaque tag naming a physical destination the backend
//! understands. Locations are independent of each other; a backend makes no
//! consistency promises across them.

pub mod local;
pub mod memory;

pub use local::LocalShardStore;
pub use memory::MemoryShardStore;

use bytes::Bytes;
use coffer_core::error::Result;
use std::future::Future;
use std::pin::Pin;

/// Async shard storage trait
///
/// All implementations must be Send + Sync for use in async contexts.
pub trait ShardStore: Send + Sync {
    /// Persist exactly the given bytes under the shard's key, creating
    /// enclosing containers as needed. Overwriting an existing shard with
    /// the same key is permitted.
    fn put<'a>(
        &'a self,
        object_id: &'a str,
        index: usize,
        data: Bytes,
        location: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Retrieve a shard's bytes, or `None` if no shard is stored under the
    /// key. Backend faults surface as errors.
    fn get<'a>(
        &'a self,
        object_id: &'a str,
        index: usize,
        location: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Bytes>>> + Send + 'a>>;
}
