//! Error types for proof construction.

use foodblock_canonical::CanonicalizationError;
use foodblock_core::BlockError;

/// Errors from building trees, disclosures or snapshots.
///
/// Verification never fails with an error; a proof that cannot be checked
/// is simply invalid.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProofError {
    /// A state value has no canonical form.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The snapshot block could not be built.
    #[error("block error: {0}")]
    Block(#[from] BlockError),
}

/// Convenience alias for proof results.
pub type ProofResult<T> = Result<T, ProofError>;
