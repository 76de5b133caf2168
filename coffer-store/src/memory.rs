//! In-memory shard store
//!
//! Used for testing and development. Not persistent. The inherent `remove`
//! helper lets tests simulate lost shards without a filesystem.

use crate::ShardStore;
use bytes::Bytes;
use coffer_core::error::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

type ShardKey = (String, usize, String);

/// In-memory shard store
#[derive(Default)]
pub struct MemoryShardStore {
    shards: RwLock<HashMap<ShardKey, Bytes>>,
}

impl MemoryShardStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of shards currently held
    pub fn len(&self) -> usize {
        self.shards.read().len()
    }

    /// True if no shards are held
    pub fn is_empty(&self) -> bool {
        self.shards.read().is_empty()
    }

    /// Drop one shard, returning its bytes if it was present.
    pub fn remove(&self, object_id: &str, index: usize, location: &str) -> Option<Bytes> {
        self.shards
            .write()
            .remove(&(object_id.to_string(), index, location.to_string()))
    }

    /// Replace one shard's bytes in place, returning false if absent.
    pub fn corrupt(&self, object_id: &str, index: usize, location: &str, data: Bytes) -> bool {
        let key = (object_id.to_string(), index, location.to_string());
        let mut shards = self.shards.write();
        match shards.get_mut(&key) {
            Some(slot) => {
                *slot = data;
                true
            }
            None => false,
        }
    }

    /// Drop everything
    pub fn clear(&self) {
        self.shards.write().clear();
    }
}

impl ShardStore for MemoryShardStore {
    fn put<'a>(
        &'a self,
        object_id: &'a str,
        index: usize,
        data: Bytes,
        location: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.shards
                .write()
                .insert((object_id.to_string(), index, location.to_string()), data);
            Ok(())
        })
    }

    fn get<'a>(
        &'a self,
        object_id: &'a str,
        index: usize,
        location: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Bytes>>> + Send + 'a>> {
        Box::pin(async move {
            let key = (object_id.to_string(), index, location.to_string());
            Ok(self.shards.read().get(&key).cloned())
        })
    }
}
