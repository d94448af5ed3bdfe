//! State-level diff: compare two block state maps.
//!
//! Values are compared by canonical form, so `5` and `5.0` are equal and
//! key order inside nested objects never matters.

use serde::Serialize;

use foodblock_canonical::{canonical_value, CanonicalResult};
use foodblock_types::{Map, Value};

/// The result of comparing two state maps.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StateDiff {
    /// Changes in key order.
    pub changes: Vec<StateChange>,
}

impl StateDiff {
    /// Returns `true` if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Number of added keys.
    pub fn additions(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, StateChange::Added { .. }))
            .count()
    }

    /// Number of removed keys.
    pub fn removals(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, StateChange::Removed { .. }))
            .count()
    }

    /// Number of modified keys.
    pub fn modifications(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, StateChange::Modified { .. }))
            .count()
    }
}

/// A single change in a state map.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum StateChange {
    /// Present only in the new state.
    Added { key: String, value: Value },
    /// Present only in the old state.
    Removed { key: String, value: Value },
    /// Present in both with canonically different values.
    Modified { key: String, old: Value, new: Value },
}

impl StateChange {
    pub fn key(&self) -> &str {
        match self {
            Self::Added { key, .. } | Self::Removed { key, .. } | Self::Modified { key, .. } => key,
        }
    }
}

/// Compute the diff between two state maps.
///
/// Fails only if a value present on both sides has no canonical form.
pub fn diff_states(old: &Map, new: &Map) -> CanonicalResult<StateDiff> {
    let mut changes = Vec::new();

    for (key, old_val) in old {
        match new.get(key) {
            Some(new_val) => {
                if canonical_value(old_val)? != canonical_value(new_val)? {
                    changes.push(StateChange::Modified {
                        key: key.clone(),
                        old: old_val.clone(),
                        new: new_val.clone(),
                    });
                }
            }
            None => changes.push(StateChange::Removed {
                key: key.clone(),
                value: old_val.clone(),
            }),
        }
    }

    for (key, new_val) in new {
        if !old.contains_key(key) {
            changes.push(StateChange::Added {
                key: key.clone(),
                value: new_val.clone(),
            });
        }
    }

    changes.sort_by(|a, b| a.key().cmp(b.key()));
    Ok(StateDiff { changes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: serde_json::Value) -> Map {
        Value::from(value).into_object().unwrap()
    }

    #[test]
    fn identical_states_no_diff() {
        let s = state(json!({"a": 1, "b": "hello"}));
        assert!(diff_states(&s, &s).unwrap().is_empty());
    }

    #[test]
    fn numeric_representation_is_irrelevant() {
        let old = state(json!({"price": 5}));
        let new = state(json!({"price": 5.0}));
        assert!(diff_states(&old, &new).unwrap().is_empty());
    }

    #[test]
    fn classifies_changes() {
        let old = state(json!({"a": 1, "b": 2, "c": {"x": 1}}));
        let new = state(json!({"b": 3, "c": {"x": 1}, "d": true}));
        let diff = diff_states(&old, &new).unwrap();
        assert_eq!(diff.len(), 3);
        assert_eq!(diff.additions(), 1);
        assert_eq!(diff.removals(), 1);
        assert_eq!(diff.modifications(), 1);
        let keys: Vec<&str> = diff.changes.iter().map(StateChange::key).collect();
        assert_eq!(keys, vec!["a", "b", "d"]);
    }

    #[test]
    fn non_finite_value_fails() {
        let mut old = Map::new();
        old.insert("x".into(), Value::Number(f64::NAN));
        let new = old.clone();
        assert!(diff_states(&old, &new).is_err());
    }
}
