//! Coffer Core Library
//!
//! Primitives for the Coffer object-storage engine:
//! - Gzip payload compression
//! - AES-256-GCM authenticated encryption
//! - Reed-Solomon erasure coding (4 data + 2 parity shards by default)
//! - Blake3 Merkle commitments with per-shard inclusion proofs
//! - Common error handling

pub mod codec;
pub mod crypto;
pub mod erasure;
pub mod error;
pub mod merkle;

pub use crypto::EncryptionKey;
pub use erasure::{ErasureCoder, ErasureConfig};
pub use error::{CofferError, Result};
pub use merkle::{MerkleProof, MerkleTree};

/// Default erasure coding configuration
/// - 4 data shards: minimum required to reconstruct
/// - 2 parity shards: can tolerate 2 missing shards
/// - 6 total shards distributed across locations
///
/// Override at runtime through the engine configuration.
pub const DATA_SHARDS: usize = 4;
pub const PARITY_SHARDS: usize = 2;
pub const TOTAL_SHARDS: usize = DATA_SHARDS + PARITY_SHARDS;
