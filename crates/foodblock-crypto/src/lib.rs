//! Hashing primitives for FoodBlock.
//!
//! Provides SHA-256 content hashing and binary Merkle trees whose interior
//! nodes are hashed over sorted child pairs, together with inclusion proofs.
//!
//! Digests come from `sha2`; nothing here implements a primitive itself.

pub mod hasher;
pub mod merkle;

pub use hasher::ContentHasher;
pub use merkle::{fold_path, MerkleProof, MerkleTree, ProofStep, Side};
