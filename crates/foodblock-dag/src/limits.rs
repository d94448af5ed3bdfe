use serde::{Deserialize, Serialize};

/// Depth bounds for every traversal.
///
/// Missing fields in a deserialized config take their default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalLimits {
    /// Backward steps for [`chain`](crate::chain::chain).
    pub chain: usize,
    /// Forward steps for [`head`](crate::chain::head).
    pub head: usize,
    /// Backward steps per side for [`detect_conflict`](crate::detect_conflict).
    pub conflict: usize,
    /// Depth of [`provenance_tree`](crate::provenance_tree).
    pub tree: usize,
    /// Depth of [`recall`](crate::recall).
    pub recall: usize,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            chain: 100,
            head: 1000,
            conflict: 1000,
            tree: 20,
            recall: 50,
        }
    }
}
