//! Snapshots: a Merkle commitment to a set of blocks.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use foodblock_core::{kinds, Block, Refs};
use foodblock_crypto::MerkleTree;
use foodblock_types::{BlockHash, Map, Value};

use crate::error::ProofResult;

/// Merkle root over block hashes, independent of input order.
///
/// Hashes are sorted, then paired and promoted like any other tree. One
/// hash is its own root; none gives `SHA256("")`.
pub fn snapshot_root(hashes: &[BlockHash]) -> BlockHash {
    let mut sorted = hashes.to_vec();
    sorted.sort();
    MerkleTree::from_leaves(sorted).root()
}

/// Create an `observe.snapshot` block committing to `blocks`.
///
/// The state holds `merkle_root` and `block_count`, plus `summary` and
/// `date_range` (as `[from, to]`) when given.
pub fn create_snapshot(
    blocks: &[Block],
    summary: Option<&str>,
    date_range: Option<(&str, &str)>,
) -> ProofResult<Block> {
    let hashes: Vec<BlockHash> = blocks.iter().map(|b| *b.hash()).collect();
    let root = snapshot_root(&hashes);

    let mut state = Map::new();
    state.insert("merkle_root".into(), Value::from(root.to_hex()));
    state.insert("block_count".into(), Value::from(blocks.len()));
    if let Some(summary) = summary {
        state.insert("summary".into(), Value::from(summary));
    }
    if let Some((from, to)) = date_range {
        state.insert(
            "date_range".into(),
            Value::Array(vec![Value::from(from), Value::from(to)]),
        );
    }

    let snapshot = Block::create(kinds::SNAPSHOT, state, Refs::new())?;
    debug!(root = %root.short_hex(), count = blocks.len(), "created snapshot");
    Ok(snapshot)
}

/// Check that `candidates` are exactly the blocks `snapshot` commits to.
///
/// Both the root and the count must match. A snapshot without a
/// well-formed `merkle_root` never verifies.
pub fn verify_snapshot(snapshot: &Block, candidates: &[Block]) -> bool {
    let Some(expected) = snapshot
        .state()
        .get("merkle_root")
        .and_then(Value::as_str)
        .and_then(|s| BlockHash::from_hex(s).ok())
    else {
        return false;
    };
    let count_matches = snapshot
        .state()
        .get("block_count")
        .and_then(Value::as_f64)
        .is_some_and(|n| n == candidates.len() as f64);

    let hashes: Vec<BlockHash> = candidates.iter().map(|b| *b.hash()).collect();
    count_matches && snapshot_root(&hashes) == expected
}

/// Block counts for a collection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
}

/// Count `blocks` in total and per type.
pub fn summarize(blocks: &[Block]) -> SnapshotSummary {
    let mut by_type = BTreeMap::new();
    for block in blocks {
        *by_type.entry(block.block_type().to_string()).or_insert(0) += 1;
    }
    SnapshotSummary {
        total: blocks.len(),
        by_type,
    }
}
