//! Coffer Metadata Catalogue
//!
//! The catalogue is the single shared mutable resource of the engine: it
//! records buckets, objects and immutable version rows. A version row binds
//! a version id to its placement map, its per-shard inclusion proofs, its
//! Merkle root and its ciphertext; committing the row is the linearisation
//! point of a write. Two implementations are provided:
//! - `MemoryCatalogue` for tests and ephemeral use
//! - `SledCatalogue` for durable single-node deployments

pub mod memory;
pub mod models;
pub mod sled_backend;

pub use memory::MemoryCatalogue;
pub use models::{parse_shard_key, shard_key, VersionMetadata, VersionRecord};
pub use sled_backend::SledCatalogue;

use bytes::Bytes;
use coffer_core::error::Result;
use std::future::Future;
use std::pin::Pin;

/// Async catalogue trait
///
/// Implementations serialise concurrent access internally; `add_version`
/// must be atomic and reject a version id that is already recorded.
pub trait Catalogue: Send + Sync {
    /// Create a bucket. Creating an existing bucket is a no-op.
    fn create_bucket<'a>(
        &'a self,
        bucket_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Check whether a bucket exists
    fn bucket_exists<'a>(
        &'a self,
        bucket_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

    /// Record an object row. Idempotent; later registrations overwrite the
    /// stored filename.
    fn register_object<'a>(
        &'a self,
        bucket_id: &'a str,
        object_id: &'a str,
        filename: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Atomically commit a version row together with its ciphertext.
    ///
    /// `root_version` is the back-reference to the object's first version,
    /// `None` on the first write. Fails with `DuplicateVersion` if the
    /// version id is already present.
    fn add_version<'a>(
        &'a self,
        metadata: &'a VersionMetadata,
        root_version: Option<&'a str>,
        ciphertext: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Fetch one version's metadata, or `None` if the pair is unknown
    fn get_version<'a>(
        &'a self,
        object_id: &'a str,
        version_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<VersionMetadata>>> + Send + 'a>>;

    /// The object's first version id, or `None` before the first write
    fn get_root_version<'a>(
        &'a self,
        object_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>>;

    /// The filename recorded for an object
    fn get_filename<'a>(
        &'a self,
        object_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>>;

    /// The ciphertext stored alongside a version row
    fn get_ciphertext<'a>(
        &'a self,
        version_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Bytes>>> + Send + 'a>>;
}
