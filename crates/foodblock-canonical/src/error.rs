//! Error types for canonicalization.

/// Error returned when a value has no canonical form.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CanonicalizationError {
    /// `NaN` or an infinity was found.
    #[error("non-finite number at {0}")]
    NonFiniteNumber(String),

    /// The value nests deeper than the canonicalizer accepts.
    #[error("value nests deeper than {limit} levels at {path}")]
    NestingTooDeep { path: String, limit: usize },

    /// Two keys of one object are equal after NFC normalization.
    #[error("duplicate key {key:?} after normalization at {path}")]
    DuplicateKey { path: String, key: String },
}

/// Convenience alias for canonicalization results.
pub type CanonicalResult<T> = Result<T, CanonicalizationError>;
