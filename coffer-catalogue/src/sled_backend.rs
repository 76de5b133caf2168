//! Sled-backed catalogue
//!
//! Durable single-node catalogue. Sled provides multi-tree transactions and
//! is pure Rust; a version row, its ciphertext and the object's root
//! back-reference are committed in one transaction, so either the whole row
//! lands or none of it does, a duplicate version id can never overwrite an
//! existing row, and the database is flushed before `add_version` returns.
//!
//! Version records are stored as JSON in the string-keyed persisted form
//! (see [`crate::models::VersionRecord`]).

use crate::models::{VersionMetadata, VersionRecord};
use crate::Catalogue;
use bytes::Bytes;
use coffer_core::error::{CofferError, Result};
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use tracing::{debug, info};

#[derive(Serialize, Deserialize)]
struct ObjectRecord {
    bucket_id: String,
    filename: String,
}

/// Sled-backed catalogue
pub struct SledCatalogue {
    db: sled::Db,
    buckets: sled::Tree,
    objects: sled::Tree,
    roots: sled::Tree,
    versions: sled::Tree,
    ciphertexts: sled::Tree,
}

fn backend_err(err: sled::Error) -> CofferError {
    CofferError::Catalogue(err.to_string())
}

impl SledCatalogue {
    /// Open or create a catalogue at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!(path = ?path.as_ref(), "opening sled catalogue");
        let db = sled::open(path.as_ref()).map_err(backend_err)?;
        Self::with_db(db)
    }

    /// Open an in-memory catalogue (for testing)
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(backend_err)?;
        Self::with_db(db)
    }

    fn with_db(db: sled::Db) -> Result<Self> {
        let buckets = db.open_tree("buckets").map_err(backend_err)?;
        let objects = db.open_tree("objects").map_err(backend_err)?;
        let roots = db.open_tree("roots").map_err(backend_err)?;
        let versions = db.open_tree("versions").map_err(backend_err)?;
        let ciphertexts = db.open_tree("ciphertexts").map_err(backend_err)?;
        Ok(Self {
            db,
            buckets,
            objects,
            roots,
            versions,
            ciphertexts,
        })
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush().map_err(backend_err)?;
        Ok(())
    }

    fn load_record(&self, version_id: &str) -> Result<Option<VersionRecord>> {
        match self.versions.get(version_id).map_err(backend_err)? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }
}

impl Catalogue for SledCatalogue {
    fn create_bucket<'a>(
        &'a self,
        bucket_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.buckets
                .insert(bucket_id, Vec::<u8>::new())
                .map_err(backend_err)?;
            Ok(())
        })
    }

    fn bucket_exists<'a>(
        &'a self,
        bucket_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move { self.buckets.contains_key(bucket_id).map_err(backend_err) })
    }

    fn register_object<'a>(
        &'a self,
        bucket_id: &'a str,
        object_id: &'a str,
        filename: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let record = ObjectRecord {
                bucket_id: bucket_id.to_string(),
                filename: filename.to_string(),
            };
            let encoded = serde_json::to_vec(&record)?;
            self.objects
                .insert(object_id, encoded)
                .map_err(backend_err)?;
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
            let record = VersionRecord::from_metadata(metadata, root_version);
            let encoded = serde_json::to_vec(&record)?;

            // One transaction over the three trees: the row, its ciphertext
            // and the root back-reference commit together or not at all. A
            // version row is written at most once; the first version of the
            // object becomes its root and losers of the race keep the
            // established root.
            let committed: std::result::Result<(), TransactionError<CofferError>> =
                (&self.versions, &self.ciphertexts, &self.roots).transaction(
                    |(versions, ciphertexts, roots)| {
                        if versions.get(metadata.version_id.as_bytes())?.is_some() {
                            return Err(ConflictableTransactionError::Abort(
                                CofferError::DuplicateVersion(metadata.version_id.clone()),
                            ));
                        }
                        versions.insert(metadata.version_id.as_bytes(), encoded.clone())?;
                        ciphertexts
                            .insert(metadata.version_id.as_bytes(), ciphertext.to_vec())?;
                        if roots.get(metadata.object_id.as_bytes())?.is_none() {
                            roots.insert(
                                metadata.object_id.as_bytes(),
                                metadata.version_id.as_bytes(),
                            )?;
                        }
                        Ok(())
                    },
                );
            match committed {
                Ok(()) => {}
                Err(TransactionError::Abort(e)) => return Err(e),
                Err(TransactionError::Storage(e)) => return Err(backend_err(e)),
            }

            self.db.flush().map_err(backend_err)?;
            debug!(version = %metadata.version_id, object = %metadata.object_id, "committed version row");
            Ok(())
        })
    }

    fn get_version<'a>(
        &'a self,
        object_id: &'a str,
        version_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<VersionMetadata>>> + Send + 'a>> {
        Box::pin(async move {
            match self.load_record(version_id)? {
                Some(record) if record.object_id == object_id => {
                    Ok(Some(record.into_metadata()?))
                }
                _ => Ok(None),
            }
        })
    }

    fn get_root_version<'a>(
        &'a self,
        object_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move {
            match self.roots.get(object_id).map_err(backend_err)? {
                Some(raw) => Ok(Some(
                    String::from_utf8(raw.to_vec())
                        .map_err(|e| CofferError::Catalogue(e.to_string()))?,
                )),
                None => Ok(None),
            }
        })
    }

    fn get_filename<'a>(
        &'a self,
        object_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move {
            match self.objects.get(object_id).map_err(backend_err)? {
                Some(raw) => {
                    let record: ObjectRecord = serde_json::from_slice(&raw)?;
                    Ok(Some(record.filename))
                }
                None => Ok(None),
            }
        })
    }

    fn get_ciphertext<'a>(
        &'a self,
        version_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Bytes>>> + Send + 'a>> {
        Box::pin(async move {
            Ok(self
                .ciphertexts
                .get(version_id)
                .map_err(backend_err)?
                .map(|raw| Bytes::from(raw.to_vec())))
        })
    }
}
