//! Typed block references.
//!
//! A block's `refs` map a role name to one hash or to a set of hashes. Ref
//! values are opaque strings: the engine never holds a live reference to
//! another block, only a key that must be looked up through a resolver.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use foodblock_types::{BlockHash, Map, Value};

use crate::kinds;

/// The target of a single ref role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefTarget {
    /// A single hash.
    One(String),
    /// An order-insignificant set of hashes.
    Set(Vec<String>),
}

impl RefTarget {
    /// Build a set target from hashes.
    pub fn set<I, S>(hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Set(hashes.into_iter().map(Into::into).collect())
    }

    /// All hash strings named by this target.
    pub fn hashes(&self) -> Vec<&str> {
        match self {
            Self::One(h) => vec![h.as_str()],
            Self::Set(hs) => hs.iter().map(String::as_str).collect(),
        }
    }

    /// Whether this target names `hash`.
    pub fn contains(&self, hash: &str) -> bool {
        match self {
            Self::One(h) => h == hash,
            Self::Set(hs) => hs.iter().any(|h| h == hash),
        }
    }

    /// The single hash named, if this target names exactly one.
    pub fn single(&self) -> Option<&str> {
        match self {
            Self::One(h) => Some(h),
            Self::Set(hs) if hs.len() == 1 => Some(&hs[0]),
            Self::Set(_) => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::One(h) => Value::from(h.as_str()),
            Self::Set(hs) => Value::Array(hs.iter().map(|h| Value::from(h.as_str())).collect()),
        }
    }
}

impl From<BlockHash> for RefTarget {
    fn from(hash: BlockHash) -> Self {
        Self::One(hash.to_hex())
    }
}

impl From<&BlockHash> for RefTarget {
    fn from(hash: &BlockHash) -> Self {
        Self::One(hash.to_hex())
    }
}

impl From<&str> for RefTarget {
    fn from(hash: &str) -> Self {
        Self::One(hash.to_string())
    }
}

impl From<String> for RefTarget {
    fn from(hash: String) -> Self {
        Self::One(hash)
    }
}

/// Role → target map carried by every block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Refs(BTreeMap<String, RefTarget>);

impl Refs {
    /// Empty refs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, role: impl Into<String>, target: impl Into<RefTarget>) -> Self {
        self.insert(role, target);
        self
    }

    /// Insert or replace a role.
    pub fn insert(&mut self, role: impl Into<String>, target: impl Into<RefTarget>) {
        self.0.insert(role.into(), target.into());
    }

    pub fn get(&self, role: &str) -> Option<&RefTarget> {
        self.0.get(role)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate roles in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RefTarget)> {
        self.0.iter()
    }

    /// Roles whose target names `hash`.
    pub fn roles_referencing(&self, hash: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, target)| target.contains(hash))
            .map(|(role, _)| role.as_str())
            .collect()
    }

    /// The predecessor named by `refs.updates`, if it is a single valid hash.
    pub fn updates(&self) -> Option<BlockHash> {
        let raw = self.get(kinds::UPDATES)?.single()?;
        parse_hash(kinds::UPDATES, raw)
    }

    /// The heads named by `refs.merges` that parse as hashes.
    pub fn merges(&self) -> Vec<BlockHash> {
        self.get(kinds::MERGES)
            .map(|target| {
                target
                    .hashes()
                    .into_iter()
                    .filter_map(|raw| parse_hash(kinds::MERGES, raw))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The principal named by `refs.author`.
    pub fn author(&self) -> Option<&str> {
        self.get(kinds::AUTHOR)?.single()
    }

    /// The refs as a value map, as fed to the canonicalizer.
    pub fn to_map(&self) -> Map {
        self.0
            .iter()
            .map(|(role, target)| (role.clone(), target.to_value()))
            .collect()
    }
}

impl FromIterator<(String, RefTarget)> for Refs {
    fn from_iter<T: IntoIterator<Item = (String, RefTarget)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn parse_hash(role: &str, raw: &str) -> Option<BlockHash> {
    match BlockHash::from_hex(raw) {
        Ok(hash) => Some(hash),
        Err(e) => {
            debug!(role, value = raw, error = %e, "ref is not a block hash");
            None
        }
    }
}
