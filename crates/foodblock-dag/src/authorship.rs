//! Author-scoped successor acceptance.
//!
//! A block's principal is its `refs.author`. A successor continues a chain
//! only if its principal is the predecessor's, or one the predecessor's
//! principal delegated to in an `observe.delegation` block. Anything else
//! that names the predecessor in `refs.updates` is a fork.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use foodblock_core::{kinds, Block};

/// Grants recorded in delegation blocks: grantor -> grantees.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delegations {
    grants: BTreeMap<String, BTreeSet<String>>,
}

impl Delegations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `grantor` lets `grantee` continue its chains.
    pub fn grant(&mut self, grantor: impl Into<String>, grantee: impl Into<String>) {
        self.grants
            .entry(grantor.into())
            .or_default()
            .insert(grantee.into());
    }

    /// Collect grants from every `observe.delegation` block among `blocks`.
    ///
    /// A delegation block names its grantor in `refs.author` and one or more
    /// grantees in `refs.delegate`. Blocks missing either are ignored.
    pub fn from_blocks<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Self {
        let mut delegations = Self::new();
        for block in blocks {
            if block.block_type() != kinds::DELEGATION {
                continue;
            }
            let (Some(grantor), Some(grantees)) =
                (block.author(), block.refs().get(kinds::DELEGATE))
            else {
                debug!(hash = %block.hash().short_hex(), "delegation block without author or delegate");
                continue;
            };
            for grantee in grantees.hashes() {
                delegations.grant(grantor, grantee);
            }
        }
        delegations
    }

    /// Whether `grantor` delegated to `grantee`.
    pub fn is_delegated(&self, grantor: &str, grantee: &str) -> bool {
        self.grants
            .get(grantor)
            .is_some_and(|grantees| grantees.contains(grantee))
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

/// Decides whether an update successor continues a chain.
#[derive(Clone, Debug, Default)]
pub struct AcceptancePolicy {
    delegations: Delegations,
    any_author: bool,
}

impl AcceptancePolicy {
    /// Accept only successors by the same principal.
    pub fn same_author() -> Self {
        Self::default()
    }

    /// Accept the same principal or anyone it delegated to.
    pub fn with_delegations(delegations: Delegations) -> Self {
        Self {
            delegations,
            any_author: false,
        }
    }

    /// Accept every update successor regardless of author.
    pub fn any_author() -> Self {
        Self {
            delegations: Delegations::new(),
            any_author: true,
        }
    }

    /// Whether a successor authored by `successor` continues a chain whose
    /// current principal is `principal`. `None` is the anonymous principal,
    /// which matches only itself.
    pub fn accepts(&self, principal: Option<&str>, successor: Option<&str>) -> bool {
        if self.any_author {
            return true;
        }
        match (principal, successor) {
            (None, None) => true,
            (Some(p), Some(s)) => p == s || self.delegations.is_delegated(p, s),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodblock_core::{Map, Refs};

    fn delegation(grantor: &str, grantee: &str) -> Block {
        Block::create(
            kinds::DELEGATION,
            Map::new(),
            Refs::new()
                .with(kinds::AUTHOR, grantor)
                .with(kinds::DELEGATE, grantee),
        )
        .unwrap()
    }

    #[test]
    fn same_author_policy() {
        let policy = AcceptancePolicy::same_author();
        assert!(policy.accepts(Some("bakery"), Some("bakery")));
        assert!(!policy.accepts(Some("bakery"), Some("rival")));
        assert!(!policy.accepts(Some("bakery"), None));
        assert!(!policy.accepts(None, Some("bakery")));
        assert!(policy.accepts(None, None));
    }

    #[test]
    fn delegation_blocks_grant_acceptance() {
        let blocks = [delegation("bakery", "manager")];
        let policy = AcceptancePolicy::with_delegations(Delegations::from_blocks(&blocks));
        assert!(policy.accepts(Some("bakery"), Some("manager")));
        assert!(!policy.accepts(Some("manager"), Some("bakery")));
    }

    #[test]
    fn non_delegation_blocks_ignored() {
        let other = Block::create(
            "observe.review",
            Map::new(),
            Refs::new().with(kinds::AUTHOR, "a").with(kinds::DELEGATE, "b"),
        )
        .unwrap();
        assert!(Delegations::from_blocks([&other]).is_empty());
    }

    #[test]
    fn any_author_accepts_everything() {
        let policy = AcceptancePolicy::any_author();
        assert!(policy.accepts(Some("a"), Some("b")));
        assert!(policy.accepts(None, Some("b")));
    }
}
