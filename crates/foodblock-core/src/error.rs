//! Error types for block construction.

use foodblock_canonical::CanonicalizationError;

/// Errors that can occur while building a block.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BlockError {
    /// Block types are namespaced strings and may not be empty.
    #[error("block type must not be empty")]
    EmptyType,

    /// The content has no canonical form.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Convenience alias for block results.
pub type BlockResult<T> = Result<T, BlockError>;
