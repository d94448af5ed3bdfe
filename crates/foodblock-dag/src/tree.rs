//! Full provenance tree over every ref role.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::debug;

use foodblock_core::Block;
use foodblock_store::BlockResolver;
use foodblock_types::BlockHash;

use crate::error::DagResult;

/// A block and the subtrees of every block it references, by role.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProvenanceNode {
    pub block: Block,
    pub ancestors: BTreeMap<String, Vec<ProvenanceNode>>,
}

impl ProvenanceNode {
    /// Number of blocks in this subtree, including this one.
    pub fn size(&self) -> usize {
        1 + self
            .ancestors
            .values()
            .flatten()
            .map(ProvenanceNode::size)
            .sum::<usize>()
    }
}

/// Follow every ref of `start` recursively.
///
/// Each block appears at most once in the tree (first visit wins). Ref
/// values that are not block hashes, and hashes the resolver does not know,
/// are left out. Roles with no resolvable target are omitted. Returns
/// `None` if `start` itself cannot be resolved or `max_depth` is zero.
pub fn provenance_tree<R>(
    start: &BlockHash,
    resolver: &R,
    max_depth: usize,
) -> DagResult<Option<ProvenanceNode>>
where
    R: BlockResolver + ?Sized,
{
    let mut visited = HashSet::new();
    build(start, resolver, 0, max_depth, &mut visited)
}

fn build<R>(
    hash: &BlockHash,
    resolver: &R,
    depth: usize,
    max_depth: usize,
    visited: &mut HashSet<BlockHash>,
) -> DagResult<Option<ProvenanceNode>>
where
    R: BlockResolver + ?Sized,
{
    if depth >= max_depth || !visited.insert(*hash) {
        return Ok(None);
    }
    let Some(block) = resolver.resolve(hash)? else {
        debug!(hash = %hash.short_hex(), "provenance tree leaf is unresolved");
        return Ok(None);
    };

    let mut ancestors = BTreeMap::new();
    for (role, target) in block.refs().iter() {
        let mut subtrees = Vec::new();
        for raw in target.hashes() {
            let Ok(parent) = BlockHash::from_hex(raw) else {
                continue;
            };
            if let Some(subtree) = build(&parent, resolver, depth + 1, max_depth, visited)? {
                subtrees.push(subtree);
            }
        }
        if !subtrees.is_empty() {
            ancestors.insert(role.clone(), subtrees);
        }
    }

    Ok(Some(ProvenanceNode { block, ancestors }))
}
