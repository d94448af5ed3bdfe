//! Merge engine for FoodBlock forks.
//!
//! Two heads that share an ancestor are reconciled into one `observe.merge`
//! block naming both in `refs.merges`. That block is a multi-parent DAG node
//! and the new head of both branches.
//!
//! - [`merge`] -- whole-state strategies (`manual`, `a_wins`, `b_wins`)
//! - [`auto_merge`] -- field-by-field with [`FieldPolicies`]
//! - [`diff_states`] -- canonical comparison of two states

pub mod diff;
pub mod error;
pub mod resolver;
pub mod strategy;

pub use diff::{diff_states, StateChange, StateDiff};
pub use error::{MergeError, MergeResult};
pub use resolver::{auto_merge, merge};
pub use strategy::{FieldPolicies, FieldPolicy, MergeStrategy};
