//! Downstream traversal: who references a block, and recall tracing.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use foodblock_core::Block;
use foodblock_store::BlockResolver;
use foodblock_types::BlockHash;

use crate::error::DagResult;

/// A block referencing a target, with the role it references it under.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForwardRef {
    pub block: Block,
    pub role: String,
}

/// Every `(block, role)` pair referencing `hash`.
///
/// A block naming `hash` under two roles appears twice.
pub fn forward<R>(hash: &BlockHash, resolver: &R) -> DagResult<Vec<ForwardRef>>
where
    R: BlockResolver + ?Sized,
{
    let target = hash.to_hex();
    let mut result = Vec::new();
    for block in resolver.resolve_forward(hash)? {
        let roles: Vec<String> = block
            .refs()
            .roles_referencing(&target)
            .into_iter()
            .map(str::to_string)
            .collect();
        for role in roles {
            result.push(ForwardRef {
                block: block.clone(),
                role,
            });
        }
    }
    Ok(result)
}

/// Filters and bounds for [`recall`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallQuery {
    /// Maximum number of hops from the source.
    pub max_depth: usize,
    /// Block types to follow. `ns.*` matches every type starting with
    /// `ns.`. Empty means every type.
    pub types: Vec<String>,
    /// Ref roles to follow. Empty means every role.
    pub roles: Vec<String>,
}

impl Default for RecallQuery {
    fn default() -> Self {
        Self {
            max_depth: 50,
            types: Vec::new(),
            roles: Vec::new(),
        }
    }
}

impl RecallQuery {
    /// Whether `block_type` passes the type filter.
    pub fn matches_type(&self, block_type: &str) -> bool {
        self.types.is_empty()
            || self.types.iter().any(|pattern| match pattern.strip_suffix('*') {
                Some(prefix) if prefix.ends_with('.') => block_type.starts_with(prefix),
                _ => block_type == pattern,
            })
    }

    /// Whether any of `roles` passes the role filter.
    pub fn matches_roles(&self, roles: &[&str]) -> bool {
        self.roles.is_empty() || roles.iter().any(|r| self.roles.iter().any(|want| want == r))
    }
}

/// Blocks reached by [`recall`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RecallResult {
    /// Affected blocks in breadth-first order.
    pub affected: Vec<Block>,
    /// For each affected block, the hashes from the source to it.
    pub paths: Vec<Vec<BlockHash>>,
    /// Largest hop count reached.
    pub depth: usize,
}

/// Breadth-first trace of everything downstream of `source`.
///
/// A referencing block is followed only if it passes the query's role
/// filter (for the role it uses to reference its parent) and type filter.
/// Each block is visited once.
pub fn recall<R>(source: &BlockHash, resolver: &R, query: &RecallQuery) -> DagResult<RecallResult>
where
    R: BlockResolver + ?Sized,
{
    let mut visited: HashSet<BlockHash> = HashSet::from([*source]);
    let mut result = RecallResult::default();
    let mut queue: VecDeque<(BlockHash, usize, Vec<BlockHash>)> = VecDeque::new();
    queue.push_back((*source, 0, vec![*source]));

    while let Some((current, depth, path)) = queue.pop_front() {
        if depth >= query.max_depth {
            continue;
        }
        let current_hex = current.to_hex();
        for block in resolver.resolve_forward(&current)? {
            if visited.contains(block.hash()) {
                continue;
            }
            let roles = block.refs().roles_referencing(&current_hex);
            if !query.matches_roles(&roles) || !query.matches_type(block.block_type()) {
                continue;
            }

            visited.insert(*block.hash());
            let depth = depth + 1;
            let mut block_path = path.clone();
            block_path.push(*block.hash());

            debug!(hash = %block.hash().short_hex(), depth, "recall reached block");
            result.depth = result.depth.max(depth);
            queue.push_back((*block.hash(), depth, block_path.clone()));
            result.paths.push(block_path);
            result.affected.push(block);
        }
    }

    Ok(result)
}

/// Every `substance.*` block downstream of `ingredient`.
pub fn downstream<R>(ingredient: &BlockHash, resolver: &R) -> DagResult<Vec<Block>>
where
    R: BlockResolver + ?Sized,
{
    let query = RecallQuery {
        types: vec!["substance.*".to_string()],
        ..RecallQuery::default()
    };
    Ok(recall(ingredient, resolver, &query)?.affected)
}
