use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::RwLock;

use tracing::debug;

use foodblock_core::Block;
use foodblock_types::BlockHash;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlockResolver, BlockStore};

/// In-memory, HashMap-based block store.
///
/// Every block is indexed by its hash, and every string it names in any
/// ref role is indexed back to it, so forward lookups are a single map
/// read. Blocks are held behind a `RwLock` and cloned on read.
///
/// The store persists to and from JSON-lines files: one wire-format block
/// `{hash, type, state, refs}` per line.
pub struct InMemoryBlockStore {
    inner: RwLock<Index>,
}

#[derive(Default)]
struct Index {
    blocks: HashMap<BlockHash, Block>,
    /// Ref target string -> hashes of the blocks naming it.
    forward: HashMap<String, BTreeSet<BlockHash>>,
}

impl InMemoryBlockStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Index::default()),
        }
    }

    /// Build a store from blocks, verifying each one.
    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> StoreResult<Self> {
        let store = Self::new();
        for block in blocks {
            store.put(block)?;
        }
        Ok(store)
    }

    /// Load a JSON-lines block file.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::load_from_reader(file)
    }

    /// Load JSON-lines blocks from any reader. Blank lines are skipped.
    pub fn load_from_reader(reader: impl Read) -> StoreResult<Self> {
        let store = Self::new();
        for (idx, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let block: Block = serde_json::from_str(line)
                .map_err(|e| StoreError::Serialization(format!("line {}: {e}", idx + 1)))?;
            store.put(block)?;
        }
        debug!(blocks = store.len(), "loaded block store");
        Ok(store)
    }

    /// Write every block to `path` as JSON lines, in ascending hash order.
    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let file = File::create(path.as_ref())?;
        self.save_to_writer(file)
    }

    /// Write every block to `writer` as JSON lines, in ascending hash order.
    pub fn save_to_writer(&self, writer: impl Write) -> StoreResult<()> {
        let mut out = BufWriter::new(writer);
        for block in self.blocks() {
            serde_json::to_writer(&mut out, &block)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").blocks.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().expect("lock poisoned").blocks.is_empty()
    }

    /// Returns `true` if a block with this hash is stored.
    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.inner
            .read()
            .expect("lock poisoned")
            .blocks
            .contains_key(hash)
    }

    /// All stored hashes, sorted.
    pub fn hashes(&self) -> Vec<BlockHash> {
        let index = self.inner.read().expect("lock poisoned");
        let mut hashes: Vec<BlockHash> = index.blocks.keys().copied().collect();
        hashes.sort();
        hashes
    }

    /// All stored blocks, sorted by hash.
    pub fn blocks(&self) -> Vec<Block> {
        let index = self.inner.read().expect("lock poisoned");
        let mut blocks: Vec<Block> = index.blocks.values().cloned().collect();
        blocks.sort_by(|a, b| a.hash().cmp(b.hash()));
        blocks
    }
}

impl Default for InMemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockResolver for InMemoryBlockStore {
    fn resolve(&self, hash: &BlockHash) -> StoreResult<Option<Block>> {
        let index = self.inner.read().expect("lock poisoned");
        Ok(index.blocks.get(hash).cloned())
    }

    fn resolve_forward(&self, hash: &BlockHash) -> StoreResult<Vec<Block>> {
        let index = self.inner.read().expect("lock poisoned");
        let Some(referrers) = index.forward.get(&hash.to_hex()) else {
            return Ok(Vec::new());
        };
        Ok(referrers
            .iter()
            .filter_map(|h| index.blocks.get(h).cloned())
            .collect())
    }
}

impl BlockStore for InMemoryBlockStore {
    fn put(&self, block: Block) -> StoreResult<BlockHash> {
        let hash = *block.hash();
        let computed = block
            .computed_hash()
            .map_err(|source| StoreError::InvalidBlock { hash, source })?;
        if computed != hash {
            return Err(StoreError::HashMismatch {
                expected: hash,
                computed,
            });
        }

        let mut index = self.inner.write().expect("lock poisoned");
        if index.blocks.contains_key(&hash) {
            return Ok(hash);
        }
        for (_, target) in block.refs().iter() {
            for referenced in target.hashes() {
                index
                    .forward
                    .entry(referenced.to_string())
                    .or_default()
                    .insert(hash);
            }
        }
        debug!(hash = %hash.short_hex(), block_type = block.block_type(), "stored block");
        index.blocks.insert(hash, block);
        Ok(hash)
    }
}

impl std::fmt::Debug for InMemoryBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryBlockStore")
            .field("block_count", &count)
            .finish()
    }
}
