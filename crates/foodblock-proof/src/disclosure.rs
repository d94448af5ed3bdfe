//! Merkle trees over block state and selective disclosure.
//!
//! Each state key becomes a leaf `SHA256(key ":" canonical(value))`, with
//! leaves in sorted key order. A holder can then reveal a subset of fields
//! together with the sibling hashes needed to rebuild the root, without
//! revealing the other values.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use foodblock_canonical::canonical_value;
use foodblock_crypto::{fold_path, ContentHasher, MerkleTree, ProofStep, Side};
use foodblock_types::{BlockHash, Map, Value};

use crate::error::ProofResult;

/// A state's Merkle tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MerkleResult {
    pub root: BlockHash,
    /// Leaf hash per state key.
    pub leaves: BTreeMap<String, BlockHash>,
    /// Every layer, leaves first. Empty for an empty state.
    pub layers: Vec<Vec<BlockHash>>,
}

/// One sibling hash on a disclosed field's path to the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofEntry {
    /// The disclosed field this entry belongs to.
    pub field: String,
    pub hash: BlockHash,
    pub position: Side,
    pub layer: usize,
}

/// Disclosed fields, their proof, and the root they prove against.
///
/// [`verify_proof`] requires every disclosed field to rebuild `root`, not
/// just one of them. Each [`ProofEntry`] therefore carries the `field` it
/// belongs to, and proofs whose entries lack it do not deserialize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Disclosure {
    pub disclosed: Map,
    pub proof: Vec<ProofEntry>,
    pub root: BlockHash,
}

/// Leaf hash for one state entry.
pub fn leaf_hash(key: &str, value: &Value) -> ProofResult<BlockHash> {
    let encoded = match value {
        Value::Null => "null".to_string(),
        other => canonical_value(other)?,
    };
    Ok(ContentHasher::hash_str(&format!("{key}:{encoded}")))
}

fn build(state: &Map) -> ProofResult<(BTreeMap<String, BlockHash>, MerkleTree)> {
    let leaves = state
        .iter()
        .map(|(k, v)| Ok((k.clone(), leaf_hash(k, v)?)))
        .collect::<ProofResult<BTreeMap<_, _>>>()?;
    let tree = MerkleTree::from_leaves(leaves.values().copied().collect());
    Ok((leaves, tree))
}

/// Build the Merkle tree of `state`.
pub fn merkleize(state: &Map) -> ProofResult<MerkleResult> {
    let (leaves, tree) = build(state)?;
    Ok(MerkleResult {
        root: tree.root(),
        leaves,
        layers: tree.levels().to_vec(),
    })
}

/// Reveal `fields` of `state` with a proof against its Merkle root.
///
/// Field names not present in `state` are skipped, as are repeats.
pub fn selective_disclose(state: &Map, fields: &[&str]) -> ProofResult<Disclosure> {
    let (_, tree) = build(state)?;
    let mut disclosed = Map::new();
    let mut proof = Vec::new();

    for field in fields {
        if disclosed.contains_key(*field) {
            continue;
        }
        // Leaves are in key order, so the index is the key's rank.
        let Some(index) = state.keys().position(|k| k == field) else {
            debug!(field, "skipping unknown field");
            continue;
        };
        let Some(path) = tree.path(index) else {
            continue;
        };
        disclosed.insert(field.to_string(), state[*field].clone());
        proof.extend(path.into_iter().map(|step| ProofEntry {
            field: field.to_string(),
            hash: step.hash,
            position: step.position,
            layer: step.layer,
        }));
    }

    Ok(Disclosure {
        disclosed,
        proof,
        root: tree.root(),
    })
}

/// Check that every disclosed field rebuilds `root`.
///
/// Each field's entries must appear in strictly increasing layer order.
/// Entries naming a field that is not disclosed make the proof invalid.
/// An empty disclosure is valid only with an empty proof against the
/// empty-state root.
pub fn verify_proof(disclosed: &Map, proof: &[ProofEntry], root: &BlockHash) -> bool {
    if disclosed.is_empty() {
        return proof.is_empty() && *root == ContentHasher::empty_root();
    }

    let fields: HashSet<&str> = proof.iter().map(|e| e.field.as_str()).collect();
    if fields.iter().any(|f| !disclosed.contains_key(*f)) {
        debug!("proof names an undisclosed field");
        return false;
    }

    disclosed.iter().all(|(key, value)| {
        let Ok(leaf) = leaf_hash(key, value) else {
            return false;
        };
        let steps: Vec<ProofStep> = proof
            .iter()
            .filter(|e| e.field == *key)
            .map(|e| ProofStep {
                hash: e.hash,
                position: e.position,
                layer: e.layer,
            })
            .collect();
        fold_path(leaf, &steps) == Some(*root)
    })
}
