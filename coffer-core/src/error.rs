//! Error types for Coffer
//!
//! Provides a unified error type shared by every crate in the workspace.

use thiserror::Error;

/// Result type alias for Coffer operations
pub type Result<T> = std::result::Result<T, CofferError>;

/// Unified error type for Coffer
#[derive(Error, Debug)]
pub enum CofferError {
    // ===== Catalogue Errors =====
    #[error("Bucket not found: {0}")]
    UnknownBucket(String),

    #[error("Object not found: {0}")]
    UnknownObject(String),

    #[error("Version not found: {0}")]
    UnknownVersion(String),

    #[error("Version already exists: {0}")]
    DuplicateVersion(String),

    #[error("Catalogue error: {0}")]
    Catalogue(String),

    // ===== Placement Errors =====
    #[error("Placement underspecified: {provided} locations for {required} shards")]
    PlacementUnderspecified { provided: usize, required: usize },

    // ===== Erasure Coding Errors =====
    #[error("Erasure coding error: {0}")]
    Erasure(String),

    #[error("Insufficient shards: have {available}, need {required}")]
    InsufficientShards { available: usize, required: usize },

    #[error("Shard count mismatch: expected {expected}, got {actual}")]
    ShardCountMismatch { expected: usize, actual: usize },

    #[error("Invalid shard index: {index} (max: {max})")]
    InvalidShardIndex { index: usize, max: usize },

    // ===== Merkle Errors =====
    #[error("Cannot build a Merkle tree over an empty shard set")]
    EmptyShardSet,

    #[error("Merkle proof verification failed for shard {index}")]
    ProofFailed { index: usize },

    #[error("Malformed Merkle proof: {0}")]
    ProofEncoding(String),

    // ===== Cryptography Errors =====
    #[error("Ciphertext failed authentication")]
    AuthenticationFailure,

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    // ===== Codec Errors =====
    #[error("Corrupt compressed input: {0}")]
    CorruptInput(String),

    // ===== I/O Errors =====
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ===== Configuration Errors =====
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ===== Serialization Errors =====
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ===== Cancellation =====
    #[error("Cancelled during {stage}")]
    Cancelled { stage: &'static str },
}

impl From<reed_solomon_erasure::Error> for CofferError {
    fn from(err: reed_solomon_erasure::Error) -> Self {
        CofferError::Erasure(err.to_string())
    }
}

impl From<serde_json::Error> for CofferError {
    fn from(err: serde_json::Error) -> Self {
        CofferError::Serialization(err.to_string())
    }
}
