//! Write/read pipeline
//!
//! The write path runs compress → encrypt → erasure-encode → Merkle-commit
//! → distribute, then records the version through the catalogue. The read
//! path gathers shards from their recorded locations, reconstructs within
//! the parity budget, optionally verifies each shard against its inclusion
//! proof, and reverses the transformations.
//!
//! The catalogue commit is the single linearisation point of a write: a
//! version row is only recorded once every shard put has succeeded, so any
//! observable version references fully written shards. A write that fails
//! mid-placement leaves orphan shards behind; they are never referenced and
//! are not cleaned up here.

use crate::config::EngineConfig;
use crate::deadline::Deadline;
use bytes::Bytes;
use chrono::Utc;
use coffer_catalogue::{Catalogue, VersionMetadata};
use coffer_core::crypto::EncryptionKey;
use coffer_core::erasure::ErasureCoder;
use coffer_core::error::{CofferError, Result};
use coffer_core::merkle::{self, MerkleProof, MerkleTree};
use coffer_core::{codec, crypto};
use coffer_store::ShardStore;
use futures::future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// A request to store one object payload as a new version
#[derive(Debug, Clone)]
pub struct WriteRequest {
    /// Bucket the object belongs to; must already exist
    pub bucket_id: String,
    /// Object identifier (opaque, externally supplied)
    pub object_id: String,
    /// Original file path, used only to derive filename and format
    pub file_path: PathBuf,
    /// Payload bytes, processed whole in memory
    pub payload: Bytes,
    /// Ordered placement; falls back to the configured default when empty
    pub locations: Vec<String>,
    /// Optional deadline for the whole operation
    pub deadline: Deadline,
}

impl WriteRequest {
    /// Build a request with default placement and no deadline
    pub fn new(
        bucket_id: impl Into<String>,
        object_id: impl Into<String>,
        file_path: impl Into<PathBuf>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            object_id: object_id.into(),
            file_path: file_path.into(),
            payload: payload.into(),
            locations: Vec::new(),
            deadline: Deadline::none(),
        }
    }

    /// Use an explicit ordered location list
    pub fn with_locations(mut self, locations: Vec<String>) -> Self {
        self.locations = locations;
        self
    }

    /// Bound the operation by a deadline
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }
}

/// The durable outcome of a successful write
#[derive(Debug, Clone)]
pub struct WriteReceipt {
    /// Freshly generated version identifier
    pub version_id: String,
    /// Location of each shard, ordered by shard index
    pub shard_locations: Vec<String>,
    /// Hex-rendered inclusion proof for each shard, ordered by shard index
    pub proofs: Vec<String>,
}

/// A request to read one stored version
#[derive(Debug, Clone)]
pub struct ReadRequest {
    /// Bucket the object belongs to
    pub bucket_id: String,
    /// Object identifier
    pub object_id: String,
    /// Version to read
    pub version_id: String,
    /// Optional deadline for the whole operation
    pub deadline: Deadline,
}

impl ReadRequest {
    /// Build a request with no deadline
    pub fn new(
        bucket_id: impl Into<String>,
        object_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            object_id: object_id.into(),
            version_id: version_id.into(),
            deadline: Deadline::none(),
        }
    }

    /// Bound the operation by a deadline
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Payload and filename returned by a successful read
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    /// The exact bytes originally stored
    pub payload: Bytes,
    /// Filename recorded for the object
    pub filename: String,
}

/// The write/read pipeline
///
/// One instance is shareable across concurrent requests; each request owns
/// its buffers and tree. The shard store is injected per call so different
/// backends can serve different requests.
pub struct Pipeline {
    catalogue: Arc<dyn Catalogue>,
    coder: ErasureCoder,
    key: EncryptionKey,
    default_locations: Vec<String>,
    verify_proofs: bool,
}

impl Pipeline {
    /// Build a pipeline from configuration
    pub fn new(catalogue: Arc<dyn Catalogue>, config: &EngineConfig) -> Result<Self> {
        let key = config.encryption_key()?;
        let coder = ErasureCoder::with_config(config.erasure_config()?)?;
        Ok(Self {
            catalogue,
            coder,
            key,
            default_locations: config.placement.locations.clone(),
            verify_proofs: config.read.verify_proofs,
        })
    }

    /// Number of shards produced per version
    pub fn total_shards(&self) -> usize {
        self.coder.config().total_shards()
    }

    /// Store a payload as a new immutable version of an object.
    #[instrument(skip(self, store, req), fields(bucket = %req.bucket_id, object = %req.object_id))]
    pub async fn write_object(
        &self,
        store: &dyn ShardStore,
        req: WriteRequest,
    ) -> Result<WriteReceipt> {
        let WriteRequest {
            bucket_id,
            object_id,
            file_path,
            payload,
            locations,
            deadline,
        } = req;
        let total = self.total_shards();

        deadline.check("bucket-check")?;
        if !self.catalogue.bucket_exists(&bucket_id).await? {
            return Err(CofferError::UnknownBucket(bucket_id));
        }

        let locations = if locations.is_empty() {
            self.default_locations.clone()
        } else {
            locations
        };
        if locations.len() < total {
            return Err(CofferError::PlacementUnderspecified {
                provided: locations.len(),
                required: total,
            });
        }

        let version_id = Uuid::new_v4().to_string();

        deadline.check("compress")?;
        let compressed = codec::compress(&payload)?;

        deadline.check("encrypt")?;
        let ciphertext = crypto::encrypt(&compressed, &self.key)?;

        deadline.check("encode")?;
        let shards = self.coder.encode(&ciphertext)?;
        debug!(
            version = %version_id,
            shards = shards.len(),
            shard_bytes = shards[0].len(),
            "encoded ciphertext"
        );

        deadline.check("merkle-commit")?;
        let tree = MerkleTree::build(&shards)?;
        let merkle_root = tree.root_hex();

        deadline.check("place")?;
        let object = object_id.as_str();
        let puts: Vec<_> = shards
            .iter()
            .enumerate()
            .map(|(index, shard)| {
                let location = locations[index].as_str();
                let shard = shard.clone();
                async move {
                    store.put(object, index, shard, location).await.map_err(|e| {
                        warn!(shard = index, location = %location, error = %e, "shard write failed");
                        e
                    })
                }
            })
            .collect();
        deadline.bound("place", future::try_join_all(puts)).await??;
        let shard_locations: Vec<String> = locations[..total].to_vec();

        deadline.check("prove")?;
        let proofs: Vec<String> = (0..total)
            .map(|index| tree.proof(index).map(|proof| proof.to_hex()))
            .collect::<Result<_>>()?;

        let filename = base_name(&file_path);
        let metadata = VersionMetadata {
            bucket_id: bucket_id.clone(),
            object_id: object_id.clone(),
            version_id: version_id.clone(),
            filename: filename.clone(),
            format: format_of(&file_path),
            filesize: human_size(payload.len() as u64),
            created_at: Utc::now(),
            merkle_root,
            shard_locations: shard_locations.clone(),
            proofs: proofs.clone(),
        };

        deadline.check("record")?;
        let root_version = self.catalogue.get_root_version(&object_id).await?;
        self.catalogue
            .add_version(&metadata, root_version.as_deref(), ciphertext)
            .await?;
        self.catalogue
            .register_object(&bucket_id, &object_id, &filename)
            .await?;

        info!(version = %version_id, shards = total, "stored object version");
        Ok(WriteReceipt {
            version_id,
            shard_locations,
            proofs,
        })
    }

    /// Read a stored version back, returning the exact original payload.
    #[instrument(skip(self, store, req), fields(object = %req.object_id, version = %req.version_id))]
    pub async fn read_object(
        &self,
        store: &dyn ShardStore,
        req: ReadRequest,
    ) -> Result<ReadOutcome> {
        let ReadRequest {
            bucket_id: _,
            object_id,
            version_id,
            deadline,
        } = req;
        let total = self.total_shards();

        deadline.check("metadata")?;
        let metadata = self
            .catalogue
            .get_version(&object_id, &version_id)
            .await?
            .ok_or(CofferError::UnknownVersion(version_id))?;

        deadline.check("gather")?;
        let object = object_id.as_str();
        let fetches: Vec<_> = (0..total)
            .map(|index| {
                let location = metadata
                    .shard_locations
                    .get(index)
                    .cloned()
                    .unwrap_or_default();
                async move {
                    if location.is_empty() {
                        warn!(shard = index, "no usable location recorded for shard");
                        return None;
                    }
                    match store.get(object, index, &location).await {
                        Ok(Some(bytes)) => Some(bytes),
                        Ok(None) => {
                            warn!(shard = index, location = %location, "shard missing from store");
                            None
                        }
                        Err(e) => {
                            warn!(shard = index, location = %location, error = %e, "shard fetch failed");
                            None
                        }
                    }
                }
            })
            .collect();
        let slots: Vec<Option<Bytes>> =
            deadline.bound("gather", future::join_all(fetches)).await?;

        let available = slots.iter().flatten().count();
        if total - available > self.coder.config().max_failures() {
            return Err(CofferError::InsufficientShards {
                available,
                required: self.coder.config().data_shards,
            });
        }

        if self.verify_proofs {
            self.verify_slots(&metadata, &slots)?;
        }

        deadline.check("decode")?;
        let ciphertext = self.coder.decode(&slots)?;

        deadline.check("decrypt")?;
        let compressed = crypto::decrypt(&ciphertext, &self.key)?;

        deadline.check("decompress")?;
        let payload = codec::decompress(&compressed)?;

        let filename = self
            .catalogue
            .get_filename(&object_id)
            .await?
            .ok_or(CofferError::UnknownObject(object_id))?;

        debug!(bytes = payload.len(), "reconstructed payload");
        Ok(ReadOutcome { payload, filename })
    }

    /// Check every present shard against its recorded inclusion proof.
    fn verify_slots(&self, metadata: &VersionMetadata, slots: &[Option<Bytes>]) -> Result<()> {
        let root = merkle::root_from_hex(&metadata.merkle_root)?;
        for (index, slot) in slots.iter().enumerate() {
            let Some(shard) = slot else { continue };
            let proof = match metadata.proofs.get(index) {
                Some(encoded) => match MerkleProof::from_hex(encoded) {
                    Ok(proof) => proof,
                    Err(e) => {
                        warn!(shard = index, error = %e, "stored proof is malformed");
                        return Err(CofferError::ProofFailed { index });
                    }
                },
                None => return Err(CofferError::ProofFailed { index }),
            };
            if !merkle::verify(&root, shard, &proof) {
                return Err(CofferError::ProofFailed { index });
            }
        }
        Ok(())
    }
}

/// Last path component of the original file
fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Trailing extension without the leading dot, possibly empty
fn format_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Human-readable byte count, binary units
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_and_format() {
        let path = PathBuf::from("/tmp/greet.txt");
        assert_eq!(base_name(&path), "greet.txt");
        assert_eq!(format_of(&path), "txt");

        let bare = PathBuf::from("/var/data/blob");
        assert_eq!(base_name(&bare), "blob");
        assert_eq!(format_of(&bare), "");

        let nested = PathBuf::from("archive.tar.gz");
        assert_eq!(base_name(&nested), "archive.tar.gz");
        assert_eq!(format_of(&nested), "gz");
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(11), "11 B");
        assert_eq!(human_size(1023), "1023 B");
        assert_eq!(human_size(1024), "1.00 KiB");
        assert_eq!(human_size(1024 * 1024), "1.00 MiB");
        assert_eq!(human_size(1536 * 1024), "1.50 MiB");
    }
}
