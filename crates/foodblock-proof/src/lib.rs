//! Integrity proofs over FoodBlock data.
//!
//! - [`merkleize`], [`selective_disclose`], [`verify_proof`] -- reveal some
//!   fields of a block's state and prove they belong to it
//! - [`create_snapshot`], [`verify_snapshot`] -- commit to a set of blocks
//!   with one Merkle root
//!
//! All trees sort each pair of hex digests before hashing them together, so
//! sibling order never affects a root.

pub mod disclosure;
pub mod error;
pub mod snapshot;

pub use disclosure::{
    leaf_hash, merkleize, selective_disclose, verify_proof, Disclosure, MerkleResult, ProofEntry,
};
pub use error::{ProofError, ProofResult};
pub use snapshot::{
    create_snapshot, snapshot_root, summarize, verify_snapshot, SnapshotSummary,
};
