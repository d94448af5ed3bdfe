use foodblock_core::Block;
use foodblock_types::BlockHash;

use crate::error::StoreResult;

/// Read-only access to blocks by hash.
///
/// This is the only capability the graph engine needs from its host. All
/// implementations must satisfy:
/// - `resolve` returns `Ok(None)` for an unknown hash, never an error.
/// - `resolve_forward` returns every block whose refs name `hash` under any
///   role, in ascending hash order.
/// - I/O and decoding failures are propagated, never silently dropped.
pub trait BlockResolver: Send + Sync {
    /// Look up a block by hash.
    fn resolve(&self, hash: &BlockHash) -> StoreResult<Option<Block>>;

    /// Blocks that reference `hash` in any ref role.
    fn resolve_forward(&self, hash: &BlockHash) -> StoreResult<Vec<Block>>;

    /// Look up several blocks.
    ///
    /// Default implementation calls `resolve()` for each hash.
    fn resolve_batch(&self, hashes: &[BlockHash]) -> StoreResult<Vec<Option<Block>>> {
        hashes.iter().map(|h| self.resolve(h)).collect()
    }
}

/// A resolver that also accepts new blocks.
pub trait BlockStore: BlockResolver {
    /// Insert a block after checking its hash. Re-inserting is a no-op.
    fn put(&self, block: Block) -> StoreResult<BlockHash>;

    /// Insert several blocks and return their hashes.
    ///
    /// Default implementation calls `put()` for each block and stops at the
    /// first failure.
    fn put_batch(&self, blocks: Vec<Block>) -> StoreResult<Vec<BlockHash>> {
        blocks.into_iter().map(|b| self.put(b)).collect()
    }
}
