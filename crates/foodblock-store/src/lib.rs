//! Block storage for the FoodBlock engine.
//!
//! The graph engine never owns storage. It reaches blocks only through the
//! [`BlockResolver`] capability: `resolve(hash)` for a block and
//! `resolve_forward(hash)` for the blocks that reference it.
//!
//! # Backends
//!
//! - [`InMemoryBlockStore`] -- `HashMap`-based store with a forward index,
//!   loadable from and savable to JSON-lines files
//!
//! # Rules
//!
//! 1. Blocks are immutable once stored; re-inserting is a no-op.
//! 2. Every insert recomputes the hash and rejects mismatches.
//! 3. Absence is `Ok(None)`, never an error.
//! 4. All I/O errors are propagated.

pub mod error;
pub mod fsck;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fsck::{check_lines, FsckIssue, FsckReport};
pub use memory::InMemoryBlockStore;
pub use traits::{BlockResolver, BlockStore};
