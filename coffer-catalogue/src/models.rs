//! Catalogue data model
//!
//! `VersionMetadata` is the in-process shape: placement and proofs are
//! ordered arrays indexed by shard position. `VersionRecord` is the
//! persisted shape: the same data with string-keyed `shard_0 …` maps and an
//! RFC-3339 timestamp, which is what lands in the catalogue backend.

use chrono::{DateTime, Utc};
use coffer_core::error::{CofferError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

const SHARD_KEY_PREFIX: &str = "shard_";

/// Map key for the shard at `index` in the persisted form
pub fn shard_key(index: usize) -> String {
    format!("{}{}", SHARD_KEY_PREFIX, index)
}

/// Parse a persisted map key back to a shard index
pub fn parse_shard_key(key: &str) -> Option<usize> {
    key.strip_prefix(SHARD_KEY_PREFIX)?.parse().ok()
}

/// Metadata describing one immutable version of an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMetadata {
    /// Bucket the object belongs to
    pub bucket_id: String,
    /// Object identifier (opaque, externally supplied)
    pub object_id: String,
    /// Freshly generated version identifier
    pub version_id: String,
    /// Last path component of the original file
    pub filename: String,
    /// Trailing extension without the leading dot, possibly empty
    pub format: String,
    /// Human-readable payload size, possibly empty
    pub filesize: String,
    /// Instant the version was created
    pub created_at: DateTime<Utc>,
    /// Hex-rendered Merkle root over the shard set
    pub merkle_root: String,
    /// Location of each shard, ordered by shard index. An empty entry marks
    /// a slot whose persisted key could not be parsed.
    pub shard_locations: Vec<String>,
    /// Hex-rendered inclusion proof for each shard, ordered by shard index
    pub proofs: Vec<String>,
}

/// Persisted catalogue row for one version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    pub bucket_id: String,
    pub object_id: String,
    pub version_id: String,
    /// Version id of the object's first version; empty for the first write
    pub root_version: String,
    pub filename: String,
    pub format: String,
    pub filesize: String,
    /// RFC-3339 UTC instant
    pub creation_date: String,
    pub merkle_root: String,
    pub shard_locations: BTreeMap<String, String>,
    pub proofs: BTreeMap<String, String>,
}

impl VersionRecord {
    /// Serialise metadata into the persisted string-keyed form.
    pub fn from_metadata(metadata: &VersionMetadata, root_version: Option<&str>) -> Self {
        let shard_locations = metadata
            .shard_locations
            .iter()
            .enumerate()
            .map(|(i, loc)| (shard_key(i), loc.clone()))
            .collect();
        let proofs = metadata
            .proofs
            .iter()
            .enumerate()
            .map(|(i, proof)| (shard_key(i), proof.clone()))
            .collect();

        Self {
            bucket_id: metadata.bucket_id.clone(),
            object_id: metadata.object_id.clone(),
            version_id: metadata.version_id.clone(),
            root_version: root_version.unwrap_or_default().to_string(),
            filename: metadata.filename.clone(),
            format: metadata.format.clone(),
            filesize: metadata.filesize.clone(),
            creation_date: metadata.created_at.to_rfc3339(),
            merkle_root: metadata.merkle_root.clone(),
            shard_locations,
            proofs,
        }
    }

    /// Parse the persisted form back into ordered arrays.
    ///
    /// Map entries whose key does not parse to an index within the slot
    /// count are dropped with a warning; their slots stay empty and the
    /// read path treats them as missing shards.
    pub fn into_metadata(self) -> Result<VersionMetadata> {
        let created_at = DateTime::parse_from_rfc3339(&self.creation_date)
            .map_err(|e| {
                CofferError::Serialization(format!(
                    "invalid creation date {:?}: {}",
                    self.creation_date, e
                ))
            })?
            .with_timezone(&Utc);

        Ok(VersionMetadata {
            bucket_id: self.bucket_id,
            object_id: self.object_id,
            version_id: self.version_id,
            filename: self.filename,
            format: self.format,
            filesize: self.filesize,
            created_at,
            merkle_root: self.merkle_root,
            shard_locations: map_to_slots(self.shard_locations, "shard location"),
            proofs: map_to_slots(self.proofs, "proof"),
        })
    }
}

fn map_to_slots(map: BTreeMap<String, String>, what: &str) -> Vec<String> {
    let count = map.len();
    let mut slots = vec![String::new(); count];
    for (key, value) in map {
        match parse_shard_key(&key) {
            Some(index) if index < count => slots[index] = value,
            _ => warn!(key = %key, "dropping {} entry with unparseable key", what),
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> VersionMetadata {
        VersionMetadata {
            bucket_id: "b1".to_string(),
            object_id: "obj-1".to_string(),
            version_id: "11111111-2222-3333-4444-555555555555".to_string(),
            filename: "greet.txt".to_string(),
            format: "txt".to_string(),
            filesize: "11 B".to_string(),
            created_at: Utc::now(),
            merkle_root: "ab".repeat(32),
            shard_locations: (0..6).map(|i| format!("loc_{}", i)).collect(),
            proofs: (0..6).map(|i| format!("{:02x}", i).repeat(33)).collect(),
        }
    }

    #[test]
    fn test_shard_key_roundtrip() {
        assert_eq!(shard_key(0), "shard_0");
        assert_eq!(shard_key(17), "shard_17");
        assert_eq!(parse_shard_key("shard_5"), Some(5));
        assert_eq!(parse_shard_key("shard_"), None);
        assert_eq!(parse_shard_key("proof_2"), None);
        assert_eq!(parse_shard_key("shard_x"), None);
    }

    #[test]
    fn test_record_roundtrip() {
        let metadata = sample_metadata();
        let record = VersionRecord::from_metadata(&metadata, Some("root-version-id"));

        assert_eq!(record.root_version, "root-version-id");
        assert_eq!(record.shard_locations.len(), 6);
        assert_eq!(record.shard_locations["shard_0"], "loc_0");
        assert_eq!(record.shard_locations["shard_5"], "loc_5");

        let restored = record.into_metadata().unwrap();
        // Timestamps survive at RFC-3339 precision; compare the rest exactly.
        assert_eq!(restored.shard_locations, metadata.shard_locations);
        assert_eq!(restored.proofs, metadata.proofs);
        assert_eq!(restored.merkle_root, metadata.merkle_root);
        assert_eq!(restored.filename, metadata.filename);
        assert_eq!(restored.version_id, metadata.version_id);
    }

    #[test]
    fn test_first_version_has_empty_root() {
        let record = VersionRecord::from_metadata(&sample_metadata(), None);
        assert_eq!(record.root_version, "");
    }

    #[test]
    fn test_json_shape_uses_string_keys() {
        let record = VersionRecord::from_metadata(&sample_metadata(), None);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["shard_locations"]["shard_3"].is_string());
        assert!(json["proofs"]["shard_3"].is_string());
    }

    #[test]
    fn test_unparseable_key_leaves_slot_empty() {
        let mut record = VersionRecord::from_metadata(&sample_metadata(), None);
        let location = record.shard_locations.remove("shard_2").unwrap();
        record
            .shard_locations
            .insert("sharde_2".to_string(), location);

        let restored = record.into_metadata().unwrap();
        assert_eq!(restored.shard_locations.len(), 6);
        assert_eq!(restored.shard_locations[2], "");
        assert_eq!(restored.shard_locations[3], "loc_3");
    }

    #[test]
    fn test_invalid_creation_date_rejected() {
        let mut record = VersionRecord::from_metadata(&sample_metadata(), None);
        record.creation_date = "yesterday-ish".to_string();
        assert!(matches!(
            record.into_metadata(),
            Err(CofferError::Serialization(_))
        ));
    }
}
