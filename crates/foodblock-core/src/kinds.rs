//! Well-known block types and ref roles.
//!
//! Types are namespaced by their base category (`actor`, `place`,
//! `substance`, `transform`, `transfer`, `observe`). Only the ones the graph
//! engine itself produces or interprets are listed here.

/// Block type of merge blocks.
pub const MERGE: &str = "observe.merge";
/// Block type of snapshot blocks.
pub const SNAPSHOT: &str = "observe.snapshot";
/// Block type of tombstones marking a block for content erasure.
pub const TOMBSTONE: &str = "observe.tombstone";
/// Block type of capability blocks delegating update rights.
pub const DELEGATION: &str = "observe.delegation";

/// Ref role naming a block's predecessor in its update chain.
pub const UPDATES: &str = "updates";
/// Ref role naming the heads reconciled by a merge block.
pub const MERGES: &str = "merges";
/// Ref role naming the principal that created a block.
pub const AUTHOR: &str = "author";
/// Ref role naming the principal granted rights by a delegation block.
pub const DELEGATE: &str = "delegate";
/// Ref role naming the block a tombstone erases.
pub const TARGET: &str = "target";
