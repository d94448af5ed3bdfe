//! Fork detection between two chain heads.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use foodblock_core::Block;
use foodblock_store::BlockResolver;
use foodblock_types::BlockHash;

use crate::error::DagResult;

/// Outcome of [`detect_conflict`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConflictResult {
    /// `true` when the two hashes differ and share an ancestor.
    pub is_conflict: bool,
    /// The most recent block both chains pass through.
    pub common_ancestor: Option<BlockHash>,
    /// Blocks of chain A after the ancestor, newest first.
    pub chain_a: Vec<Block>,
    /// Blocks of chain B after the ancestor, newest first.
    pub chain_b: Vec<Block>,
}

/// Find where the chains ending at `a` and `b` diverge.
///
/// Chain A is walked backward first, recording every hash it passes
/// (including an unresolvable terminal hash). Chain B is then walked
/// backward until it reaches one of those hashes. Each side looks at no
/// more than `max_depth` hashes, so the outcome does not depend on which
/// head is passed first.
///
/// The returned chains are the divergent segments, excluding the ancestor.
/// With no ancestor they are the full walks. If one hash is an ancestor of
/// the other this still reports a conflict: the caller asked about two
/// different heads of one history.
pub fn detect_conflict<R>(
    a: &BlockHash,
    b: &BlockHash,
    resolver: &R,
    max_depth: usize,
) -> DagResult<ConflictResult>
where
    R: BlockResolver + ?Sized,
{
    if a == b {
        return Ok(ConflictResult {
            is_conflict: false,
            common_ancestor: Some(*a),
            chain_a: Vec::new(),
            chain_b: Vec::new(),
        });
    }

    let mut visited_a: HashSet<BlockHash> = HashSet::new();
    let mut chain_a: Vec<Block> = Vec::new();
    let mut current = Some(*a);
    while let Some(hash) = current {
        if chain_a.len() >= max_depth {
            warn!(start = %a.short_hex(), max_depth, "conflict walk truncated on side A");
            break;
        }
        if !visited_a.insert(hash) {
            break;
        }
        let Some(block) = resolver.resolve(&hash)? else {
            break;
        };
        current = block.refs().updates();
        chain_a.push(block);
    }

    let mut visited_b: HashSet<BlockHash> = HashSet::new();
    let mut chain_b: Vec<Block> = Vec::new();
    let mut common_ancestor = None;
    let mut current = Some(*b);
    while let Some(hash) = current {
        // Same bound as side A: a hash past it is never compared.
        if chain_b.len() >= max_depth {
            warn!(start = %b.short_hex(), max_depth, "conflict walk truncated on side B");
            break;
        }
        if visited_a.contains(&hash) {
            common_ancestor = Some(hash);
            break;
        }
        if !visited_b.insert(hash) {
            break;
        }
        let Some(block) = resolver.resolve(&hash)? else {
            break;
        };
        current = block.refs().updates();
        chain_b.push(block);
    }

    if let Some(ancestor) = common_ancestor {
        if let Some(pos) = chain_a.iter().position(|blk| *blk.hash() == ancestor) {
            chain_a.truncate(pos);
        }
    }

    debug!(
        a = %a.short_hex(),
        b = %b.short_hex(),
        ancestor = ?common_ancestor.map(|h| h.short_hex()),
        "conflict check"
    );

    Ok(ConflictResult {
        is_conflict: common_ancestor.is_some(),
        common_ancestor,
        chain_a,
        chain_b,
    })
}
