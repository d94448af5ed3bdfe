//! The FoodBlock block model.
//!
//! Every record is a [`Block`]: an immutable `{hash, type, state, refs}`
//! value whose hash is the SHA-256 of its canonical form. Blocks link to
//! each other only through hash strings in [`Refs`].
//!
//! # Constructors
//!
//! - [`Block::create`] -- new record
//! - [`Block::update`] -- successor in an update chain (`refs.updates`)
//! - [`Block::merge_update`] -- successor with a shallow state overlay
//! - [`Block::create_event`] -- record with a random `instance_id`
//! - [`Block::tombstone`] -- erasure marker
//! - [`Block::merge_of`] -- multi-parent merge block

pub mod block;
pub mod error;
pub mod kinds;
pub mod refs;

pub use block::{compute_hash, Block};
pub use error::{BlockError, BlockResult};
pub use refs::{RefTarget, Refs};

pub use foodblock_types::{BlockHash, Map, Value};
