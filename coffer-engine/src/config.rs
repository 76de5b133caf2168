//! Engine configuration
//!
//! Supports loading from TOML files and environment variables.

use coffer_core::crypto::EncryptionKey;
use coffer_core::erasure::ErasureConfig;
use coffer_core::error::{CofferError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Encryption key material
    #[serde(default)]
    pub encryption: EncryptionSettings,

    /// Erasure coding parameters
    #[serde(default)]
    pub erasure: ErasureSettings,

    /// Default shard placement
    #[serde(default)]
    pub placement: PlacementSettings,

    /// Local shard store settings
    #[serde(default)]
    pub storage: StorageSettings,

    /// Read-path policy
    #[serde(default)]
    pub read: ReadSettings,
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)
            .map_err(|e| CofferError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key_hex) = std::env::var("COFFER_ENCRYPTION_KEY") {
            self.encryption.key_hex = key_hex;
        }
        if let Ok(data) = std::env::var("COFFER_DATA_SHARDS") {
            if let Ok(count) = data.parse::<usize>() {
                self.erasure.data_shards = count;
            }
        }
        if let Ok(parity) = std::env::var("COFFER_PARITY_SHARDS") {
            if let Ok(count) = parity.parse::<usize>() {
                self.erasure.parity_shards = count;
            }
        }
        if let Ok(base) = std::env::var("COFFER_BASE_PATH") {
            self.storage.base_path = PathBuf::from(base);
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.encryption_key()?;
        let erasure = self.erasure_config()?;
        if !self.placement.locations.is_empty()
            && self.placement.locations.len() < erasure.total_shards()
        {
            return Err(CofferError::Configuration(format!(
                "placement lists {} locations but {} shards are produced per version",
                self.placement.locations.len(),
                erasure.total_shards()
            )));
        }
        Ok(())
    }

    /// Parse the configured key material
    pub fn encryption_key(&self) -> Result<EncryptionKey> {
        if self.encryption.key_hex.is_empty() {
            return Err(CofferError::Configuration(
                "encryption key is not configured".to_string(),
            ));
        }
        EncryptionKey::from_hex(&self.encryption.key_hex)
    }

    /// Build the erasure configuration
    pub fn erasure_config(&self) -> Result<ErasureConfig> {
        ErasureConfig::new(self.erasure.data_shards, self.erasure.parity_shards)
    }
}

/// Encryption key settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncryptionSettings {
    /// Raw symmetric key as 64 hex characters
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_hex: String,
}

/// Erasure coding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErasureSettings {
    /// Number of data shards per version (K)
    #[serde(default = "default_data_shards")]
    pub data_shards: usize,

    /// Number of parity shards per version (M)
    #[serde(default = "default_parity_shards")]
    pub parity_shards: usize,
}

impl Default for ErasureSettings {
    fn default() -> Self {
        Self {
            data_shards: default_data_shards(),
            parity_shards: default_parity_shards(),
        }
    }
}

fn default_data_shards() -> usize {
    coffer_core::DATA_SHARDS
}

fn default_parity_shards() -> usize {
    coffer_core::PARITY_SHARDS
}

/// Default shard placement settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementSettings {
    /// Ordered list of location tags used when a write names none
    #[serde(default)]
    pub locations: Vec<String>,
}

/// Local shard store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Root directory for the local shard store backend
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
        }
    }
}

fn default_base_path() -> PathBuf {
    PathBuf::from("./coffer_data")
}

/// Read-path policy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadSettings {
    /// Verify each fetched shard against its recorded inclusion proof
    #[serde(default = "default_true")]
    pub verify_proofs: bool,
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self {
            verify_proofs: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}
