//! Graph traversal over FoodBlock update chains.
//!
//! Blocks form chains through `refs.updates`, forks when two successors
//! name the same predecessor, and DAGs once a merge block names several
//! heads in `refs.merges`. Everything here reads the graph through a
//! [`BlockResolver`](foodblock_store::BlockResolver) and never writes.
//!
//! Every walk is bounded by a caller-supplied depth (see
//! [`TraversalLimits`]) and a visited set. Hitting a bound truncates the
//! result; it is never an error.

pub mod authorship;
pub mod chain;
pub mod conflict;
pub mod error;
pub mod forward;
pub mod limits;
pub mod tree;

pub use authorship::{AcceptancePolicy, Delegations};
pub use chain::{chain, head};
pub use conflict::{detect_conflict, ConflictResult};
pub use error::{DagError, DagResult};
pub use forward::{downstream, forward, recall, ForwardRef, RecallQuery, RecallResult};
pub use limits::TraversalLimits;
pub use tree::{provenance_tree, ProvenanceNode};
