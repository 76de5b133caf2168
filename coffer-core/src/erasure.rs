//! Reed-Solomon erasure coding
//!
//! Splits a byte blob into `K` data shards plus `M` parity shards such that
//! any `K` of the `N = K + M` shards reconstruct the blob. The blob is
//! zero-padded up to a whole number of equally-sized shards; `decode`
//! returns the padded frame. The cipher envelope stored through this layer
//! records its own length, so the read path sheds the padding when the
//! envelope is opened.

use crate::error::{CofferError, Result};
use crate::{DATA_SHARDS, PARITY_SHARDS};
use bytes::Bytes;
use reed_solomon_erasure::galois_8::ReedSolomon;
use serde::{Deserialize, Serialize};

/// GF(2^8) Reed-Solomon supports at most 256 shards in total.
const MAX_TOTAL_SHARDS: usize = 256;

/// Erasure coding configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ErasureConfig {
    /// Number of data shards (K)
    pub data_shards: usize,
    /// Number of parity shards (M)
    pub parity_shards: usize,
}

impl Default for ErasureConfig {
    fn default() -> Self {
        Self {
            data_shards: DATA_SHARDS,
            parity_shards: PARITY_SHARDS,
        }
    }
}

impl ErasureConfig {
    /// Create a new erasure config
    pub fn new(data_shards: usize, parity_shards: usize) -> Result<Self> {
        if data_shards == 0 {
            return Err(CofferError::Configuration(
                "data_shards must be > 0".to_string(),
            ));
        }
        if parity_shards == 0 {
            return Err(CofferError::Configuration(
                "parity_shards must be > 0".to_string(),
            ));
        }
        if data_shards + parity_shards > MAX_TOTAL_SHARDS {
            return Err(CofferError::Configuration(format!(
                "at most {} total shards are supported, got {}",
                MAX_TOTAL_SHARDS,
                data_shards + parity_shards
            )));
        }
        Ok(Self {
            data_shards,
            parity_shards,
        })
    }

    /// Total number of shards (N)
    pub fn total_shards(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    /// Maximum number of missing shards that can be tolerated
    pub fn max_failures(&self) -> usize {
        self.parity_shards
    }
}

/// Reed-Solomon encoder/decoder built from an [`ErasureConfig`].
///
/// Parameters are carried by the instance; writers and readers of the same
/// version must be built from the same configuration.
pub struct ErasureCoder {
    config: ErasureConfig,
    codec: ReedSolomon,
}

impl ErasureCoder {
    /// Create a coder with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ErasureConfig::default())
    }

    /// Create a coder with a custom configuration
    pub fn with_config(config: ErasureConfig) -> Result<Self> {
        let codec = ReedSolomon::new(config.data_shards, config.parity_shards)?;
        Ok(Self { config, codec })
    }

    /// Get the erasure configuration
    pub fn config(&self) -> &ErasureConfig {
        &self.config
    }

    /// Encode a blob into `N` equally-sized shards in index order.
    ///
    /// Shards at indices `< K` carry the zero-padded data, the rest carry
    /// parity.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<Bytes>> {
        let k = self.config.data_shards;
        let shard_size = data.len().div_ceil(k).max(1);

        let mut padded = data.to_vec();
        padded.resize(shard_size * k, 0);

        let mut shards: Vec<Vec<u8>> = padded.chunks(shard_size).map(|c| c.to_vec()).collect();
        for _ in 0..self.config.parity_shards {
            shards.push(vec![0u8; shard_size]);
        }

        self.codec.encode(&mut shards)?;

        Ok(shards.into_iter().map(Bytes::from).collect())
    }

    /// Decode `N` optional shard slots back into the padded frame.
    ///
    /// Missing shards are `None`; at least `K` slots must be present.
    /// Reconstruction is deterministic: any admissible subset of slots
    /// yields the same frame, the original blob followed by its zero
    /// padding.
    pub fn decode(&self, slots: &[Option<Bytes>]) -> Result<Bytes> {
        let total = self.config.total_shards();
        if slots.len() != total {
            return Err(CofferError::ShardCountMismatch {
                expected: total,
                actual: slots.len(),
            });
        }

        let available = slots.iter().filter(|s| s.is_some()).count();
        if available < self.config.data_shards {
            return Err(CofferError::InsufficientShards {
                available,
                required: self.config.data_shards,
            });
        }

        let mut shards: Vec<Option<Vec<u8>>> = slots
            .iter()
            .map(|slot| slot.as_ref().map(|b| b.to_vec()))
            .collect();

        self.codec.reconstruct(&mut shards)?;

        let shard_size = shards[0].as_ref().map(|s| s.len()).unwrap_or(0);
        let mut frame = Vec::with_capacity(shard_size * self.config.data_shards);
        for shard in shards.iter().take(self.config.data_shards) {
            match shard {
                Some(bytes) => frame.extend_from_slice(bytes),
                None => {
                    return Err(CofferError::Erasure(
                        "reconstruction left a data shard empty".to_string(),
                    ))
                }
            }
        }

        Ok(Bytes::from(frame))
    }
}
