//! The immutable [`Block`] and its constructors.
//!
//! A block is `{hash, type, state, refs}` with
//! `hash = SHA256(canonical(type, state, refs))`. Blocks are never mutated:
//! "updating" a record means creating a new block whose `refs.updates`
//! names the old one.

use serde::{Deserialize, Serialize};
use tracing::debug;

use foodblock_canonical::canonical;
use foodblock_crypto::ContentHasher;
use foodblock_types::{strip_nulls, BlockHash, Map, Value};

use crate::error::{BlockError, BlockResult};
use crate::kinds;
use crate::refs::{RefTarget, Refs};

/// An immutable content-addressed record.
///
/// Two blocks with canonically equal `(type, state, refs)` share a hash.
/// This is deliberate deduplication; producers that need distinct identities
/// for identical content put an `instance_id` in the state (see
/// [`Block::create_event`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    hash: BlockHash,
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    state: Map,
    #[serde(default)]
    refs: Refs,
}

impl Block {
    /// Create a block. `null` entries in `state` are dropped before hashing.
    pub fn create(block_type: impl Into<String>, state: Map, refs: Refs) -> BlockResult<Self> {
        let block_type = block_type.into();
        if block_type.is_empty() {
            return Err(BlockError::EmptyType);
        }
        let state = strip_nulls(&state);
        let hash = compute_hash(&block_type, &state, &refs)?;
        debug!(hash = %hash.short_hex(), block_type = %block_type, "created block");
        Ok(Self {
            hash,
            block_type,
            state,
            refs,
        })
    }

    /// Create a block that supersedes `previous` (sets `refs.updates`).
    pub fn update(
        previous: &BlockHash,
        block_type: impl Into<String>,
        state: Map,
        refs: Refs,
    ) -> BlockResult<Self> {
        Self::create(block_type, state, refs.with(kinds::UPDATES, previous))
    }

    /// Create a block with a random `instance_id` in its state, unless the
    /// caller already supplied one.
    ///
    /// Use this for events (orders, readings, reviews) that must stay
    /// distinct even when their content coincides.
    pub fn create_event(
        block_type: impl Into<String>,
        mut state: Map,
        refs: Refs,
    ) -> BlockResult<Self> {
        let has_id = state.get("instance_id").is_some_and(|v| !v.is_null());
        if !has_id {
            state.insert(
                "instance_id".into(),
                Value::from(uuid::Uuid::new_v4().to_string()),
            );
        }
        Self::create(block_type, state, refs)
    }

    /// Update `previous` by shallow-merging `changes` over its state.
    ///
    /// Keys in `changes` replace keys in the previous state; a `null` change
    /// removes the key. `extra_refs` are the new block's refs apart from
    /// `updates`.
    pub fn merge_update(previous: &Block, changes: Map, extra_refs: Refs) -> BlockResult<Self> {
        let mut state = previous.state.clone();
        state.extend(changes);
        Self::update(&previous.hash, previous.block_type.clone(), state, extra_refs)
    }

    /// Mark `target` for content erasure.
    ///
    /// The tombstone both targets and updates the erased block, so it becomes
    /// the head of the erased block's chain.
    pub fn tombstone(target: &BlockHash, requested_by: &str) -> BlockResult<Self> {
        let mut state = Map::new();
        state.insert("reason".into(), Value::from("erasure_request"));
        state.insert("requested_by".into(), Value::from(requested_by));
        let refs = Refs::new()
            .with(kinds::TARGET, target)
            .with(kinds::UPDATES, target);
        Self::create(kinds::TOMBSTONE, state, refs)
    }

    /// Create a merge block reconciling `heads`.
    pub fn merge_of(heads: &[BlockHash], state: Map) -> BlockResult<Self> {
        let refs = Refs::new().with(
            kinds::MERGES,
            RefTarget::set(heads.iter().map(BlockHash::to_hex)),
        );
        Self::create(kinds::MERGE, state, refs)
    }

    pub fn hash(&self) -> &BlockHash {
        &self.hash
    }

    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    pub fn state(&self) -> &Map {
        &self.state
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    /// The principal that created this block (`refs.author`).
    pub fn author(&self) -> Option<&str> {
        self.refs.author()
    }

    /// Canonical bytes of this block, the input to its hash.
    pub fn canonical_bytes(&self) -> BlockResult<Vec<u8>> {
        Ok(canonical(&self.block_type, &self.state, &self.refs.to_map())?)
    }

    /// Recompute the hash and compare it with the stored one.
    ///
    /// Blocks built through the constructors always verify; blocks received
    /// over the wire may not.
    pub fn verify(&self) -> bool {
        matches!(self.computed_hash(), Ok(hash) if hash == self.hash)
    }

    /// The hash this block's content actually canonicalizes to.
    pub fn computed_hash(&self) -> BlockResult<BlockHash> {
        compute_hash(&self.block_type, &strip_nulls(&self.state), &self.refs)
    }
}

/// Hash of a `(type, state, refs)` triple.
pub fn compute_hash(block_type: &str, state: &Map, refs: &Refs) -> BlockResult<BlockHash> {
    let bytes = canonical(block_type, state, &refs.to_map())?;
    Ok(ContentHasher::hash(&bytes))
}
