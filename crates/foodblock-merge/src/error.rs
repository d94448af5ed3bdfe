//! Error types for the merge engine.

use foodblock_canonical::CanonicalizationError;
use foodblock_core::BlockError;
use foodblock_store::StoreError;
use foodblock_types::BlockHash;

/// Errors that can occur during merge operations.
///
/// Every variant aborts the merge. Nothing is ever resolved by guessing.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The `manual` strategy was chosen without a state.
    #[error("manual merge requires a state")]
    ManualStateRequired,

    /// A head to merge could not be resolved.
    #[error("could not resolve {0}")]
    UnresolvableReference(BlockHash),

    /// A strategy name is not recognised.
    #[error("unknown merge strategy: {0}")]
    UnknownStrategy(String),

    /// Two heads disagree on a field whose policy is `conflict`.
    #[error("auto-merge conflict on field {0:?}; manual resolution required")]
    FieldConflict(String),

    /// A per-field policy name is not recognised.
    #[error("unknown strategy {strategy:?} for field {field:?}")]
    UnknownFieldStrategy { strategy: String, field: String },

    /// A state value has no canonical form.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The merge block could not be built.
    #[error("block error: {0}")]
    Block(#[from] BlockError),
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
