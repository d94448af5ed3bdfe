//! Update-chain walks: history backward, head forward.

use std::collections::HashSet;

use tracing::{debug, warn};

use foodblock_core::Block;
use foodblock_store::BlockResolver;
use foodblock_types::BlockHash;

use crate::authorship::AcceptancePolicy;
use crate::error::DagResult;

/// Walk `refs.updates` backward from `start`, newest first.
///
/// Stops at an unknown hash, a block without a predecessor, a revisited
/// hash, or after `max_depth` blocks. A truncated walk is still returned.
pub fn chain<R>(start: &BlockHash, resolver: &R, max_depth: usize) -> DagResult<Vec<Block>>
where
    R: BlockResolver + ?Sized,
{
    let mut visited = HashSet::new();
    let mut result = Vec::new();
    let mut current = Some(*start);

    while let Some(hash) = current {
        if result.len() >= max_depth {
            warn!(start = %start.short_hex(), max_depth, "chain walk truncated at depth bound");
            break;
        }
        if !visited.insert(hash) {
            warn!(hash = %hash.short_hex(), "chain revisits a block");
            break;
        }
        let Some(block) = resolver.resolve(&hash)? else {
            debug!(hash = %hash.short_hex(), "chain ends at unresolved block");
            break;
        };
        current = block.refs().updates();
        result.push(block);
    }

    Ok(result)
}

/// Walk forward from `start` to the latest accepted block.
///
/// At each step the children of the current block are the blocks that
/// reference it. A child advances the walk if its `refs.merges` names the
/// current block, or if its `refs.updates` does and `policy` accepts its
/// author against the chain's current principal. Merge children take
/// precedence; among equals the lowest hash wins.
///
/// The principal starts as the author of `start` and moves to each
/// authored block the walk enters. Merge blocks without an author keep the
/// principal they inherited. If `start` cannot be resolved only merge
/// children can advance it.
pub fn head<R>(
    start: &BlockHash,
    resolver: &R,
    policy: &AcceptancePolicy,
    max_depth: usize,
) -> DagResult<BlockHash>
where
    R: BlockResolver + ?Sized,
{
    let mut principal: Option<String> = None;
    let mut resolved_start = false;
    if let Some(block) = resolver.resolve(start)? {
        principal = block.author().map(str::to_string);
        resolved_start = true;
    }

    let mut visited = HashSet::new();
    let mut current = *start;

    for _ in 0..max_depth {
        if !visited.insert(current) {
            warn!(hash = %current.short_hex(), "head walk revisits a block");
            return Ok(current);
        }
        let children = resolver.resolve_forward(&current)?;

        let mut merges: Vec<Block> = Vec::new();
        let mut updates: Vec<Block> = Vec::new();
        for child in children {
            if child.refs().merges().contains(&current) {
                merges.push(child);
            } else if child.refs().updates() == Some(current) {
                let accepted = (resolved_start || current != *start)
                    && policy.accepts(principal.as_deref(), child.author());
                if accepted {
                    updates.push(child);
                } else {
                    debug!(
                        parent = %current.short_hex(),
                        child = %child.hash().short_hex(),
                        author = child.author().unwrap_or("<anonymous>"),
                        "ignoring fork successor"
                    );
                }
            } else {
                debug!(parent = %current.short_hex(), child = %child.hash().short_hex(), "skipping non-chain referrer");
            }
        }

        let candidates = if merges.is_empty() { updates } else { merges };
        if candidates.len() > 1 {
            warn!(
                parent = %current.short_hex(),
                successors = candidates.len(),
                "ambiguous successors; choosing lowest hash"
            );
        }
        let Some(next) = candidates.into_iter().min_by(|a, b| a.hash().cmp(b.hash())) else {
            return Ok(current);
        };

        if let Some(author) = next.author() {
            principal = Some(author.to_string());
        }
        debug!(from = %current.short_hex(), to = %next.hash().short_hex(), "head walk advanced");
        current = *next.hash();
    }

    warn!(start = %start.short_hex(), max_depth, "head walk truncated at depth bound");
    Ok(current)
}
