//! Merkle commitments over shard sets
//!
//! A binary hash tree is built over the shards of a version in index order.
//! Leaves are hashed with a `0x00` domain tag and internal nodes with `0x01`
//! so a leaf can never be confused for an interior node. When a level has an
//! odd number of nodes the last node is paired with itself.
//!
//! An inclusion proof is the sibling path from a leaf to the root, one
//! direction bit per step. Persisted proofs are hex strings: each step is a
//! direction byte (`0x01` = sibling on the right) followed by the 32 sibling
//! hash bytes, steps concatenated leaf-to-root.

use crate::error::{CofferError, Result};
use bytes::Bytes;
use rayon::prelude::*;

const LEAF_TAG: u8 = 0x00;
const NODE_TAG: u8 = 0x01;

/// Serialized size of one proof step: direction byte plus sibling hash.
const STEP_LEN: usize = 1 + blake3::OUT_LEN;

fn leaf_hash(data: &[u8]) -> blake3::Hash {
    blake3::Hasher::new().update(&[LEAF_TAG]).update(data).finalize()
}

fn node_hash(left: &blake3::Hash, right: &blake3::Hash) -> blake3::Hash {
    blake3::Hasher::new()
        .update(&[NODE_TAG])
        .update(left.as_bytes())
        .update(right.as_bytes())
        .finalize()
}

/// One step of an inclusion proof: a sibling hash and which side it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofStep {
    /// Hash of the sibling node at this level
    pub sibling: [u8; blake3::OUT_LEN],
    /// True if the sibling is the right child of the parent
    pub sibling_on_right: bool,
}

/// An inclusion proof for one shard against a Merkle root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MerkleProof {
    steps: Vec<ProofStep>,
}

impl MerkleProof {
    /// Number of steps (tree height above the leaf)
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True for the single-leaf tree, whose proof is empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Render the proof as a hex string for persistence.
    pub fn to_hex(&self) -> String {
        let mut raw = Vec::with_capacity(self.steps.len() * STEP_LEN);
        for step in &self.steps {
            raw.push(step.sibling_on_right as u8);
            raw.extend_from_slice(&step.sibling);
        }
        hex::encode(raw)
    }

    /// Parse a proof from its persisted hex form.
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let raw = hex::decode(encoded)
            .map_err(|e| CofferError::ProofEncoding(format!("invalid hex: {}", e)))?;
        if raw.len() % STEP_LEN != 0 {
            return Err(CofferError::ProofEncoding(format!(
                "proof length {} is not a multiple of {}",
                raw.len(),
                STEP_LEN
            )));
        }

        let mut steps = Vec::with_capacity(raw.len() / STEP_LEN);
        for chunk in raw.chunks(STEP_LEN) {
            let sibling_on_right = match chunk[0] {
                0 => false,
                1 => true,
                other => {
                    return Err(CofferError::ProofEncoding(format!(
                        "invalid direction byte: {:#04x}",
                        other
                    )))
                }
            };
            let mut sibling = [0u8; blake3::OUT_LEN];
            sibling.copy_from_slice(&chunk[1..]);
            steps.push(ProofStep {
                sibling,
                sibling_on_right,
            });
        }
        Ok(Self { steps })
    }
}

/// Binary Merkle tree over a shard set, all levels retained.
///
/// `levels[0]` holds the leaf hashes; the last level holds the root alone.
pub struct MerkleTree {
    levels: Vec<Vec<blake3::Hash>>,
}

impl MerkleTree {
    /// Build a tree over shards in index order.
    pub fn build(shards: &[Bytes]) -> Result<Self> {
        if shards.is_empty() {
            return Err(CofferError::EmptyShardSet);
        }

        let leaves: Vec<blake3::Hash> = shards.par_iter().map(|s| leaf_hash(s)).collect();
        let mut levels = vec![leaves];

        while levels.last().map(|l| l.len()).unwrap_or(0) > 1 {
            let current = levels.last().expect("levels is never empty");
            let next: Vec<blake3::Hash> = current
                .chunks(2)
                .map(|pair| node_hash(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// Number of leaves the tree was built over
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// The root commitment
    pub fn root(&self) -> blake3::Hash {
        self.levels[self.levels.len() - 1][0]
    }

    /// The root commitment rendered as hex, for persistence
    pub fn root_hex(&self) -> String {
        self.root().to_hex().to_string()
    }

    /// Generate an inclusion proof for the shard at `index`.
    pub fn proof(&self, index: usize) -> Result<MerkleProof> {
        let leaf_count = self.leaf_count();
        if index >= leaf_count {
            return Err(CofferError::InvalidShardIndex {
                index,
                max: leaf_count - 1,
            });
        }

        let mut steps = Vec::with_capacity(self.levels.len() - 1);
        let mut position = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_position = position ^ 1;
            // The final odd node at a level is its own sibling.
            let sibling = level.get(sibling_position).unwrap_or(&level[position]);
            steps.push(ProofStep {
                sibling: *sibling.as_bytes(),
                sibling_on_right: position % 2 == 0,
            });
            position /= 2;
        }

        Ok(MerkleProof { steps })
    }
}

/// Parse a persisted root commitment from hex.
pub fn root_from_hex(encoded: &str) -> Result<blake3::Hash> {
    blake3::Hash::from_hex(encoded)
        .map_err(|e| CofferError::ProofEncoding(format!("invalid root hex: {}", e)))
}

/// Verify that `shard` is committed at some leaf of the tree rooted at `root`.
///
/// Recomputes the leaf hash and folds in the proof's siblings; returns
/// `false` on any mismatch, never an error.
pub fn verify(root: &blake3::Hash, shard: &[u8], proof: &MerkleProof) -> bool {
    let mut current = leaf_hash(shard);
    for step in &proof.steps {
        let sibling = blake3::Hash::from_bytes(step.sibling);
        current = if step.sibling_on_right {
            node_hash(&current, &sibling)
        } else {
            node_hash(&sibling, &current)
        };
    }
    current == *root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard_set(count: usize) -> Vec<Bytes> {
        (0..count)
            .map(|i| Bytes::from(vec![i as u8; 64 + i]))
            .collect()
    }

    #[test]
    fn test_empty_shard_set_rejected() {
        assert!(matches!(
            MerkleTree::build(&[]),
            Err(CofferError::EmptyShardSet)
        ));
    }

    #[test]
    fn test_single_leaf() {
        let shards = shard_set(1);
        let tree = MerkleTree::build(&shards).unwrap();
        assert_eq!(tree.root(), leaf_hash(&shards[0]));

        let proof = tree.proof(0).unwrap();
        assert!(proof.is_empty());
        assert!(verify(&tree.root(), &shards[0], &proof));
        assert!(!verify(&tree.root(), b"some other shard", &proof));
    }

    #[test]
    fn test_two_leaves() {
        let shards = shard_set(2);
        let tree = MerkleTree::build(&shards).unwrap();
        let expected = node_hash(&leaf_hash(&shards[0]), &leaf_hash(&shards[1]));
        assert_eq!(tree.root(), expected);

        let proof = tree.proof(0).unwrap();
        assert_eq!(proof.len(), 1);
        assert!(verify(&tree.root(), &shards[0], &proof));
    }

    #[test]
    fn test_all_proofs_verify() {
        // Exercise power-of-two and odd leaf counts alike.
        for count in [1usize, 2, 3, 5, 6, 7, 8, 13] {
            let shards = shard_set(count);
            let tree = MerkleTree::build(&shards).unwrap();
            let root = tree.root();

            for (i, shard) in shards.iter().enumerate() {
                let proof = tree.proof(i).unwrap();
                assert!(verify(&root, shard, &proof), "count {} leaf {}", count, i);
            }
        }
    }

    #[test]
    fn test_swapped_shard_fails() {
        let shards = shard_set(6);
        let tree = MerkleTree::build(&shards).unwrap();
        let root = tree.root();

        let proof_for_2 = tree.proof(2).unwrap();
        assert!(!verify(&root, &shards[3], &proof_for_2));
    }

    #[test]
    fn test_tampered_shard_fails() {
        let shards = shard_set(6);
        let tree = MerkleTree::build(&shards).unwrap();
        let root = tree.root();

        let mut tampered = shards[4].to_vec();
        tampered[10] ^= 0x01;
        let proof = tree.proof(4).unwrap();
        assert!(!verify(&root, &tampered, &proof));
    }

    #[test]
    fn test_tampered_proof_fails() {
        let shards = shard_set(6);
        let tree = MerkleTree::build(&shards).unwrap();
        let root = tree.root();

        let mut proof = tree.proof(0).unwrap();
        proof.steps[0].sibling[0] ^= 0x01;
        assert!(!verify(&root, &shards[0], &proof));

        let mut proof = tree.proof(0).unwrap();
        proof.steps[0].sibling_on_right = !proof.steps[0].sibling_on_right;
        assert!(!verify(&root, &shards[0], &proof));
    }

    #[test]
    fn test_proof_index_out_of_bounds() {
        let tree = MerkleTree::build(&shard_set(6)).unwrap();
        assert!(matches!(
            tree.proof(6),
            Err(CofferError::InvalidShardIndex { index: 6, max: 5 })
        ));
    }

    #[test]
    fn test_hex_roundtrip() {
        let shards = shard_set(6);
        let tree = MerkleTree::build(&shards).unwrap();

        for i in 0..6 {
            let proof = tree.proof(i).unwrap();
            let encoded = proof.to_hex();
            let decoded = MerkleProof::from_hex(&encoded).unwrap();
            assert_eq!(proof, decoded);
            assert!(verify(&tree.root(), &shards[i], &decoded));
        }

        let root_hex = tree.root_hex();
        assert_eq!(root_from_hex(&root_hex).unwrap(), tree.root());
    }

    #[test]
    fn test_malformed_proof_hex() {
        assert!(matches!(
            MerkleProof::from_hex("zz"),
            Err(CofferError::ProofEncoding(_))
        ));
        // Wrong length: not a multiple of the step size.
        assert!(matches!(
            MerkleProof::from_hex("0011"),
            Err(CofferError::ProofEncoding(_))
        ));
        // Bad direction byte.
        let mut raw = vec![0x02u8];
        raw.extend_from_slice(&[0u8; blake3::OUT_LEN]);
        assert!(matches!(
            MerkleProof::from_hex(&hex::encode(raw)),
            Err(CofferError::ProofEncoding(_))
        ));
    }

    #[test]
    fn test_leaf_and_node_domains_differ() {
        // A leaf over (left || right) bytes must not collide with the node
        // hash of the same two children.
        let left = leaf_hash(b"left");
        let right = leaf_hash(b"right");
        let mut concat = Vec::new();
        concat.extend_from_slice(left.as_bytes());
        concat.extend_from_slice(right.as_bytes());
        assert_ne!(node_hash(&left, &right), leaf_hash(&concat));
    }
}
