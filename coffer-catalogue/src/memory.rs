//! In-memory catalogue
//!
//! Used for testing and development. Not persistent. A single write lock
//! makes `add_version` atomic with respect to every other operation.

use crate::models::VersionMetadata;
use crate::Catalogue;
use bytes::Bytes;
use coffer_core::error::{CofferError, Result};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

struct ObjectEntry {
    bucket_id: String,
    filename: String,
}

struct StoredVersion {
    metadata: VersionMetadata,
    root_version: Option<String>,
    ciphertext: Bytes,
}

#[derive(Default)]
struct Inner {
    buckets: HashSet<String>,
    objects: HashMap<String, ObjectEntry>,
    /// object id -> id of the object's first version
    roots: HashMap<String, String>,
    /// version id -> stored row (version ids are globally unique)
    versions: HashMap<String, StoredVersion>,
}

/// In-memory catalogue
#[derive(Default)]
pub struct MemoryCatalogue {
    inner: RwLock<Inner>,
}

impl MemoryCatalogue {
    /// Create an empty catalogue
    pub fn new() -> Self {
        Self::default()
    }

    /// Root back-reference recorded on a version row, for inspection
    pub fn root_version_of(&self, version_id: &str) -> Option<String> {
        self.inner
            .read()
            .versions
            .get(version_id)
            .and_then(|v| v.root_version.clone())
    }

    /// Number of version rows held
    pub fn version_count(&self) -> usize {
        self.inner.read().versions.len()
    }
}

impl Catalogue for MemoryCatalogue {
    fn create_bucket<'a>(
        &'a self,
        bucket_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.inner.write().buckets.insert(bucket_id.to_string());
            Ok(())
        })
    }

    fn bucket_exists<'a>(
        &'a self,
        bucket_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move { Ok(self.inner.read().buckets.contains(bucket_id)) })
    }

    fn register_object<'a>(
        &'a self,
        bucket_id: &'a str,
        object_id: &'a str,
        filename: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.inner.write().objects.insert(
                object_id.to_string(),
                ObjectEntry {
                    bucket_id: bucket_id.to_string(),
                    filename: filename.to_string(),
                },
            );
            Ok(())
        })
    }

    fn add_version<'a>(
        &'a self,
        metadata: &'a VersionMetadata,
        root_version: Option<&'a str>,
        ciphertext: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut inner = self.inner.write();
            if inner.versions.contains_key(&metadata.version_id) {
                return Err(CofferError::DuplicateVersion(metadata.version_id.clone()));
            }

            inner.versions.insert(
                metadata.version_id.clone(),
                StoredVersion {
                    metadata: metadata.clone(),
                    root_version: root_version.map(str::to_string),
                    ciphertext,
                },
            );
            inner
                .roots
                .entry(metadata.object_id.clone())
                .or_insert_with(|| metadata.version_id.clone());
            Ok(())
        })
    }

    fn get_version<'a>(
        &'a self,
        object_id: &'a str,
        version_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<VersionMetadata>>> + Send + 'a>> {
        Box::pin(async move {
            Ok(self
                .inner
                .read()
                .versions
                .get(version_id)
                .filter(|v| v.metadata.object_id == object_id)
                .map(|v| v.metadata.clone()))
        })
    }

    fn get_root_version<'a>(
        &'a self,
        object_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.inner.read().roots.get(object_id).cloned()) })
    }

    fn get_filename<'a>(
        &'a self,
        object_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move {
            Ok(self
                .inner
                .read()
                .objects
                .get(object_id)
                .map(|o| o.filename.clone()))
        })
    }

    fn get_ciphertext<'a>(
        &'a self,
        version_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Bytes>>> + Send + 'a>> {
        Box::pin(async move {
            Ok(self
                .inner
                .read()
                .versions
                .get(version_id)
                .map(|v| v.ciphertext.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn metadata(object_id: &str, version_id: &str) -> VersionMetadata {
        VersionMetadata {
            bucket_id: "b1".to_string(),
            object_id: object_id.to_string(),
            version_id: version_id.to_string(),
            filename: "file.bin".to_string(),
            format: "bin".to_string(),
            filesize: "1 B".to_string(),
            created_at: Utc::now(),
            merkle_root: "00".repeat(32),
            shard_locations: vec!["loc_0".to_string()],
            proofs: vec![String::new()],
        }
    }

    #[tokio::test]
    async fn test_buckets() {
        let catalogue = MemoryCatalogue::new();
        assert!(!catalogue.bucket_exists("b1").await.unwrap());

        catalogue.create_bucket("b1").await.unwrap();
        assert!(catalogue.bucket_exists("b1").await.unwrap());

        // Creating again is a no-op.
        catalogue.create_bucket("b1").await.unwrap();
        assert!(catalogue.bucket_exists("b1").await.unwrap());
    }

    #[tokio::test]
    async fn test_register_object_idempotent() {
        let catalogue = MemoryCatalogue::new();
        catalogue
            .register_object("b1", "obj", "first.txt")
            .await
            .unwrap();
        catalogue
            .register_object("b1", "obj", "second.txt")
            .await
            .unwrap();

        assert_eq!(
            catalogue.get_filename("obj").await.unwrap().unwrap(),
            "second.txt"
        );
        assert!(catalogue.get_filename("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_and_get_version() {
        let catalogue = MemoryCatalogue::new();
        let meta = metadata("obj", "v1");
        catalogue
            .add_version(&meta, None, Bytes::from_static(b"ciphertext"))
            .await
            .unwrap();

        let fetched = catalogue.get_version("obj", "v1").await.unwrap().unwrap();
        assert_eq!(fetched, meta);

        // Wrong object id for the version is unknown.
        assert!(catalogue.get_version("other", "v1").await.unwrap().is_none());
        assert!(catalogue.get_version("obj", "v2").await.unwrap().is_none());

        assert_eq!(
            catalogue.get_ciphertext("v1").await.unwrap().unwrap(),
            Bytes::from_static(b"ciphertext")
        );
    }

    #[tokio::test]
    async fn test_duplicate_version_rejected() {
        let catalogue = MemoryCatalogue::new();
        let meta = metadata("obj", "v1");
        catalogue
            .add_version(&meta, None, Bytes::new())
            .await
            .unwrap();

        let result = catalogue.add_version(&meta, None, Bytes::new()).await;
        assert!(matches!(result, Err(CofferError::DuplicateVersion(id)) if id == "v1"));
        assert_eq!(catalogue.version_count(), 1);
    }

    #[tokio::test]
    async fn test_root_version_chain() {
        let catalogue = MemoryCatalogue::new();
        assert!(catalogue.get_root_version("obj").await.unwrap().is_none());

        catalogue
            .add_version(&metadata("obj", "v1"), None, Bytes::new())
            .await
            .unwrap();
        assert_eq!(
            catalogue.get_root_version("obj").await.unwrap().unwrap(),
            "v1"
        );

        catalogue
            .add_version(&metadata("obj", "v2"), Some("v1"), Bytes::new())
            .await
            .unwrap();
        // The root stays fixed on the first version.
        assert_eq!(
            catalogue.get_root_version("obj").await.unwrap().unwrap(),
            "v1"
        );
        assert_eq!(catalogue.root_version_of("v1"), None);
        assert_eq!(catalogue.root_version_of("v2"), Some("v1".to_string()));
    }
}
