//! Merge strategies and per-field auto-merge policies.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{MergeError, MergeResult};

/// How [`merge`](crate::merge) picks the merged state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// The caller supplies the state.
    #[default]
    Manual,
    /// Head A's state verbatim.
    AWins,
    /// Head B's state verbatim.
    BWins,
}

impl MergeStrategy {
    /// The tag written into the merge block's `strategy` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::AWins => "a_wins",
            Self::BWins => "b_wins",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "a_wins" => Ok(Self::AWins),
            "b_wins" => Ok(Self::BWins),
            other => Err(MergeError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Resolution rule for one field when two heads disagree on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPolicy {
    /// Take head B's value.
    LastWriterWins,
    /// Larger number wins; ties and non-numbers take B.
    Max,
    /// Smaller number wins; ties and non-numbers take B.
    Min,
    /// Concatenate both as arrays, A first, dropping canonical duplicates.
    Union,
    /// Refuse to merge.
    #[default]
    Conflict,
}

impl FieldPolicy {
    /// Parse a policy name for `field`.
    pub fn parse(field: &str, name: &str) -> MergeResult<Self> {
        match name {
            "lww" | "last_writer_wins" => Ok(Self::LastWriterWins),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            "union" => Ok(Self::Union),
            "conflict" => Ok(Self::Conflict),
            other => Err(MergeError::UnknownFieldStrategy {
                strategy: other.to_string(),
                field: field.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastWriterWins => "lww",
            Self::Max => "max",
            Self::Min => "min",
            Self::Union => "union",
            Self::Conflict => "conflict",
        }
    }
}

/// Per-field policies. Fields without an entry use [`FieldPolicy::Conflict`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldPolicies(BTreeMap<String, FieldPolicy>);

impl FieldPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `field -> policy name` pairs.
    pub fn parse<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> MergeResult<Self> {
        let mut policies = Self::new();
        for (field, name) in pairs {
            policies
                .0
                .insert(field.to_string(), FieldPolicy::parse(field, name)?);
        }
        Ok(policies)
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, policy: FieldPolicy) -> Self {
        self.0.insert(field.into(), policy);
        self
    }

    /// The policy for `field`.
    pub fn get(&self, field: &str) -> FieldPolicy {
        self.0.get(field).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_names_roundtrip() {
        for s in [MergeStrategy::Manual, MergeStrategy::AWins, MergeStrategy::BWins] {
            assert_eq!(s.as_str().parse::<MergeStrategy>().unwrap(), s);
        }
    }

    #[test]
    fn unknown_strategy() {
        match "coin_flip".parse::<MergeStrategy>() {
            Err(MergeError::UnknownStrategy(name)) => assert_eq!(name, "coin_flip"),
            other => panic!("expected UnknownStrategy, got {other:?}"),
        }
    }

    #[test]
    fn policy_aliases() {
        assert_eq!(FieldPolicy::parse("f", "lww").unwrap(), FieldPolicy::LastWriterWins);
        assert_eq!(
            FieldPolicy::parse("f", "last_writer_wins").unwrap(),
            FieldPolicy::LastWriterWins
        );
    }

    #[test]
    fn unknown_policy_names_field() {
        match FieldPolicies::parse([("price", "average")]) {
            Err(MergeError::UnknownFieldStrategy { strategy, field }) => {
                assert_eq!(strategy, "average");
                assert_eq!(field, "price");
            }
            other => panic!("expected UnknownFieldStrategy, got {other:?}"),
        }
    }

    #[test]
    fn unlisted_fields_conflict() {
        let policies = FieldPolicies::parse([("price", "max")]).unwrap();
        assert_eq!(policies.get("price"), FieldPolicy::Max);
        assert_eq!(policies.get("name"), FieldPolicy::Conflict);
    }
}
