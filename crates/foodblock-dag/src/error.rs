//! Error types for graph traversal.

use foodblock_store::StoreError;

/// Errors that can occur during traversal.
///
/// Reaching a depth bound or an unknown hash is not an error: traversals
/// return what they collected so far.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// The resolver failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for traversal results.
pub type DagResult<T> = Result<T, DagError>;
