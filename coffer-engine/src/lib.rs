//! Coffer Storage Engine
//!
//! Orchestrates the object write/read pipeline over injected collaborators:
//!
//! ```text
//! write: payload ── compress ── encrypt ── erasure-encode ── Merkle-commit
//!                ── distribute shards ── record version
//! read:  gather shards ── verify proofs ── erasure-decode ── decrypt
//!                ── decompress ── payload
//! ```
//!
//! A write either fully succeeds (a version row exists and every shard it
//! references was durably written) or fully fails (no version row; at worst
//! orphan shards). A read returns the exact bytes originally stored or a
//! typed error, never a silently corrupted payload.
//!
//! # Usage
//!
//! ```ignore
//! use coffer_engine::{EngineConfig, Pipeline, WriteRequest, ReadRequest};
//!
//! let config = EngineConfig::from_file("coffer.toml")?;
//! let catalogue = Arc::new(SledCatalogue::open(&db_path)?);
//! let store = LocalShardStore::new(&config.storage.base_path);
//! let pipeline = Pipeline::new(catalogue, &config)?;
//!
//! let receipt = pipeline
//!     .write_object(&store, WriteRequest::new("b1", "obj", "/tmp/greet.txt", payload))
//!     .await?;
//! let outcome = pipeline
//!     .read_object(&store, ReadRequest::new("b1", "obj", &receipt.version_id))
//!     .await?;
//! ```

pub mod config;
pub mod deadline;
pub mod pipeline;

pub use config::EngineConfig;
pub use deadline::Deadline;
pub use pipeline::{Pipeline, ReadOutcome, ReadRequest, WriteReceipt, WriteRequest};
