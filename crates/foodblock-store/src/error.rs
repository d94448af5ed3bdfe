use foodblock_core::BlockError;
use foodblock_types::BlockHash;

/// Errors at the block resolution boundary.
///
/// A missing block is not an error: resolvers return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A block's stored hash does not match its content.
    #[error("hash mismatch: stored {expected}, computed {computed}")]
    HashMismatch {
        expected: BlockHash,
        computed: BlockHash,
    },

    /// The block content has no canonical form, so no hash can be computed.
    #[error("invalid block {hash}: {source}")]
    InvalidBlock {
        hash: BlockHash,
        #[source]
        source: BlockError,
    },

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
