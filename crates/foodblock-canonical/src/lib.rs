//! Canonical encoding for FoodBlock hashing.
//!
//! A block's identity is the SHA-256 of `canonical(type, state, refs)`. Two
//! independent implementations given logically equal input must emit the
//! same bytes, so every rule here is fixed:
//!
//! 1. Object keys sorted lexicographically at every depth
//! 2. No whitespace
//! 3. Numbers use ECMAScript `Number::toString` formatting
//! 4. Strings and keys are Unicode NFC-normalized, then JSON-escaped
//! 5. Arrays under `refs` are sets (sorted by canonical element string)
//! 6. Arrays in `state` keep declared order
//! 7. `null` entries are omitted
//!
//! The canonical form is hash input only. Blocks travel as ordinary JSON.

pub mod canonicalizer;
pub mod error;
pub mod number;

pub use canonicalizer::{
    canonical, canonical_string, canonical_ref_value, canonical_value, MAX_NESTING_DEPTH,
};
pub use error::{CanonicalResult, CanonicalizationError};
pub use number::format_number;
