//! Local filesystem shard store
//!
//! Each shard lives at `{base}/{location}/{object_id}_shard_{index}`.
//! Location directories are created on demand and files are written whole.
//! This layout is part of the backend's external contract; alternate
//! backends may use any scheme as long as `put` and `get` are inverses.

use crate::ShardStore;
use bytes::Bytes;
use coffer_core::error::Result;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::debug;

/// Shard store backed by a local directory tree
pub struct LocalShardStore {
    base_path: PathBuf,
}

impl LocalShardStore {
    /// Create a store rooted at `base_path`. The directory itself is only
    /// created once the first shard is written.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// The root directory shards are stored under
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Filesystem path of one shard
    pub fn shard_path(&self, object_id: &str, index: usize, location: &str) -> PathBuf {
        self.base_path
            .join(location)
            .join(format!("{}_shard_{}", object_id, index))
    }
}

impl ShardStore for LocalShardStore {
    fn put<'a>(
        &'a self,
        object_id: &'a str,
        index: usize,
        data: Bytes,
        location: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let path = self.shard_path(object_id, index, location);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &data).await?;
            debug!(path = %path.display(), bytes = data.len(), "wrote shard");
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
            let path = self.shard_path(object_id, index, location);
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(Some(Bytes::from(bytes))),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = LocalShardStore::new(dir.path());
        let data = Bytes::from_static(b"shard payload");

        store.put("obj-1", 0, data.clone(), "loc_a").await.unwrap();
        let retrieved = store.get("obj-1", 0, "loc_a").await.unwrap().unwrap();
        assert_eq!(retrieved, data);
    }

    #[tokio::test]
    async fn test_missing_shard_is_none() {
        let dir = TempDir::new().unwrap();
        let store = LocalShardStore::new(dir.path());
        assert!(store.get("obj-1", 3, "loc_a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_on_disk_layout() {
        let dir = TempDir::new().unwrap();
        let store = LocalShardStore::new(dir.path());

        store
            .put("obj-1", 4, Bytes::from_static(b"x"), "loc_b")
            .await
            .unwrap();

        let expected = dir.path().join("loc_b").join("obj-1_shard_4");
        assert!(expected.exists());
        assert_eq!(store.shard_path("obj-1", 4, "loc_b"), expected);
    }

    #[tokio::test]
    async fn test_overwrite_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = LocalShardStore::new(dir.path());

        store
            .put("obj-1", 0, Bytes::from_static(b"first"), "loc_a")
            .await
            .unwrap();
        store
            .put("obj-1", 0, Bytes::from_static(b"second"), "loc_a")
            .await
            .unwrap();

        let retrieved = store.get("obj-1", 0, "loc_a").await.unwrap().unwrap();
        assert_eq!(retrieved, Bytes::from_static(b"second"));
    }

    #[tokio::test]
    async fn test_locations_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = LocalShardStore::new(dir.path());

        store
            .put("obj-1", 0, Bytes::from_static(b"a"), "loc_a")
            .await
            .unwrap();

        assert!(store.get("obj-1", 0, "loc_b").await.unwrap().is_none());
    }
}
