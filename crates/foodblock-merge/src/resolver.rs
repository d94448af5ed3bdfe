//! Fork reconciliation: build a merge block over two heads.
//!
//! A merge block has type `observe.merge`, names both heads in
//! `refs.merges`, and carries the merged state tagged with the strategy
//! that produced it. Because the head walk prefers merge children, the
//! merge block becomes the head of both branches.

use tracing::{debug, info};

use foodblock_canonical::canonical_value;
use foodblock_core::{Block, Map, Value};
use foodblock_store::BlockResolver;
use foodblock_types::BlockHash;

use crate::diff::{diff_states, StateChange};
use crate::error::{MergeError, MergeResult};
use crate::strategy::{FieldPolicies, FieldPolicy, MergeStrategy};

const STRATEGY_KEY: &str = "strategy";
const AUTO_TAG: &str = "auto";

/// Merge heads `a` and `b` with a whole-state strategy.
///
/// Both heads must resolve whatever the strategy. `manual_state` is
/// required for [`MergeStrategy::Manual`] and ignored otherwise. The
/// `strategy` field of the result always holds the strategy tag, even if
/// the chosen state had its own `strategy` key.
pub fn merge<R>(
    a: &BlockHash,
    b: &BlockHash,
    resolver: &R,
    strategy: MergeStrategy,
    manual_state: Option<Map>,
) -> MergeResult<Block>
where
    R: BlockResolver + ?Sized,
{
    let block_a = resolve(a, resolver)?;
    let block_b = resolve(b, resolver)?;

    let resolved = match strategy {
        MergeStrategy::Manual => manual_state.ok_or(MergeError::ManualStateRequired)?,
        MergeStrategy::AWins => block_a.state().clone(),
        MergeStrategy::BWins => block_b.state().clone(),
    };

    let block = Block::merge_of(&[*a, *b], tagged(resolved, strategy.as_str()))?;
    info!(
        a = %a.short_hex(),
        b = %b.short_hex(),
        merge = %block.hash().short_hex(),
        %strategy,
        "merged heads"
    );
    Ok(block)
}

/// Merge heads `a` and `b` field by field.
///
/// Keys on which both states agree canonically, and keys present on only
/// one side, are kept as they are. Every other key is settled by its
/// policy in `policies`. A key with no policy fails the whole merge with
/// [`MergeError::FieldConflict`].
pub fn auto_merge<R>(
    a: &BlockHash,
    b: &BlockHash,
    resolver: &R,
    policies: &FieldPolicies,
) -> MergeResult<Block>
where
    R: BlockResolver + ?Sized,
{
    let block_a = resolve(a, resolver)?;
    let block_b = resolve(b, resolver)?;
    let state_a = block_a.state();
    let state_b = block_b.state();

    let mut merged = state_a.clone();
    for change in diff_states(state_a, state_b)?.changes {
        match change {
            StateChange::Removed { .. } => {}
            StateChange::Added { key, value } => {
                merged.insert(key, value);
            }
            StateChange::Modified { key, old, new } => {
                let policy = policies.get(&key);
                let value = resolve_field(&key, policy, old, new)?;
                debug!(field = %key, policy = policy.as_str(), "resolved field");
                merged.insert(key, value);
            }
        }
    }

    let block = Block::merge_of(&[*a, *b], tagged(merged, AUTO_TAG))?;
    info!(
        a = %a.short_hex(),
        b = %b.short_hex(),
        merge = %block.hash().short_hex(),
        "auto-merged heads"
    );
    Ok(block)
}

fn resolve<R>(hash: &BlockHash, resolver: &R) -> MergeResult<Block>
where
    R: BlockResolver + ?Sized,
{
    resolver
        .resolve(hash)?
        .ok_or(MergeError::UnresolvableReference(*hash))
}

fn tagged(mut state: Map, tag: &str) -> Map {
    state.insert(STRATEGY_KEY.to_string(), Value::from(tag));
    state
}

/// Settle a field both heads set to different values.
fn resolve_field(key: &str, policy: FieldPolicy, a: Value, b: Value) -> MergeResult<Value> {
    match policy {
        FieldPolicy::LastWriterWins => Ok(b),
        FieldPolicy::Max => Ok(match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) if x > y => a,
            _ => b,
        }),
        FieldPolicy::Min => Ok(match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) if x < y => a,
            _ => b,
        }),
        FieldPolicy::Union => union(a, b),
        FieldPolicy::Conflict => Err(MergeError::FieldConflict(key.to_string())),
    }
}

fn union(a: Value, b: Value) -> MergeResult<Value> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in as_items(a).into_iter().chain(as_items(b)) {
        if seen.insert(canonical_value(&item)?) {
            out.push(item);
        }
    }
    Ok(Value::Array(out))
}

fn as_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodblock_core::{kinds, RefTarget, Refs};
    use foodblock_dag::{head, AcceptancePolicy};
    use foodblock_store::{BlockStore, InMemoryBlockStore};
    use serde_json::json;

    fn state(value: serde_json::Value) -> Map {
        Value::from(value).into_object().unwrap()
    }

    /// root <- a and root <- b, returning (store, a, b).
    fn fork(a: serde_json::Value, b: serde_json::Value) -> (InMemoryBlockStore, BlockHash, BlockHash) {
        let store = InMemoryBlockStore::new();
        let root = Block::create("substance.product", state(json!({"name": "Bread"})), Refs::new()).unwrap();
        let ha = store
            .put(Block::update(root.hash(), "substance.product", state(a), Refs::new()).unwrap())
            .unwrap();
        let hb = store
            .put(Block::update(root.hash(), "substance.product", state(b), Refs::new()).unwrap())
            .unwrap();
        store.put(root).unwrap();
        (store, ha, hb)
    }

    #[test]
    fn a_wins_takes_state_a() {
        let (store, a, b) = fork(json!({"price": 4.0}), json!({"price": 5.0}));
        let m = merge(&a, &b, &store, MergeStrategy::AWins, None).unwrap();
        assert_eq!(m.block_type(), kinds::MERGE);
        assert_eq!(m.state()["price"], Value::from(4.0));
        assert_eq!(m.state()["strategy"], Value::from("a_wins"));
        assert_eq!(
            m.refs().get(kinds::MERGES),
            Some(&RefTarget::set([a.to_hex(), b.to_hex()]))
        );
    }

    #[test]
    fn b_wins_takes_state_b() {
        let (store, a, b) = fork(json!({"price": 4.0}), json!({"price": 5.0}));
        let m = merge(&a, &b, &store, MergeStrategy::BWins, None).unwrap();
        assert_eq!(m.state()["price"], Value::from(5.0));
    }

    #[test]
    fn manual_requires_state() {
        let (store, a, b) = fork(json!({"price": 4.0}), json!({"price": 5.0}));
        assert!(matches!(
            merge(&a, &b, &store, MergeStrategy::Manual, None),
            Err(MergeError::ManualStateRequired)
        ));
        let m = merge(&a, &b, &store, MergeStrategy::Manual, Some(state(json!({"price": 4.5})))).unwrap();
        assert_eq!(m.state()["price"], Value::from(4.5));
        assert_eq!(m.state()["strategy"], Value::from("manual"));
    }

    #[test]
    fn strategy_tag_overrides_state_key() {
        let (store, a, b) = fork(json!({"strategy": "premium"}), json!({"price": 5.0}));
        let m = merge(&a, &b, &store, MergeStrategy::AWins, None).unwrap();
        assert_eq!(m.state()["strategy"], Value::from("a_wins"));
    }

    #[test]
    fn unresolvable_head_fails() {
        let (store, a, _) = fork(json!({"price": 4.0}), json!({"price": 5.0}));
        let missing = BlockHash::digest(b"missing");
        match merge(&a, &missing, &store, MergeStrategy::AWins, None) {
            Err(MergeError::UnresolvableReference(h)) => assert_eq!(h, missing),
            other => panic!("expected UnresolvableReference, got {other:?}"),
        }
    }

    #[test]
    fn merge_is_order_independent() {
        let (store, a, b) = fork(json!({"price": 4.0}), json!({"price": 5.0}));
        let manual = state(json!({"price": 4.5}));
        let ab = merge(&a, &b, &store, MergeStrategy::Manual, Some(manual.clone())).unwrap();
        let ba = merge(&b, &a, &store, MergeStrategy::Manual, Some(manual)).unwrap();
        assert_eq!(ab.hash(), ba.hash());
    }

    #[test]
    fn merge_block_becomes_head_of_both_branches() {
        let (store, a, b) = fork(json!({"price": 4.0}), json!({"price": 5.0}));
        let m = merge(&a, &b, &store, MergeStrategy::BWins, None).unwrap();
        store.put(m.clone()).unwrap();
        let policy = AcceptancePolicy::same_author();
        assert_eq!(head(&a, &store, &policy, 1000).unwrap(), *m.hash());
        assert_eq!(head(&b, &store, &policy, 1000).unwrap(), *m.hash());
    }

    #[test]
    fn auto_merge_keeps_agreeing_and_one_sided_fields() {
        let (store, a, b) = fork(
            json!({"name": "Bread", "organic": true}),
            json!({"name": "Bread", "gluten_free": false}),
        );
        let m = auto_merge(&a, &b, &store, &FieldPolicies::new()).unwrap();
        assert_eq!(
            Value::from(m.state().clone()),
            Value::from(json!({
                "name": "Bread",
                "organic": true,
                "gluten_free": false,
                "strategy": "auto"
            }))
        );
    }

    #[test]
    fn auto_merge_unlisted_difference_conflicts() {
        let (store, a, b) = fork(json!({"price": 4.0}), json!({"price": 5.0}));
        match auto_merge(&a, &b, &store, &FieldPolicies::new()) {
            Err(MergeError::FieldConflict(field)) => assert_eq!(field, "price"),
            other => panic!("expected FieldConflict, got {other:?}"),
        }
    }

    #[test]
    fn auto_merge_field_policies() {
        let (store, a, b) = fork(
            json!({"price": 4.0, "stock": 10, "note": "a", "tags": ["x", "y"], "label": "A"}),
            json!({"price": 5.0, "stock": 7, "note": "b", "tags": ["y", "z"], "label": 3}),
        );
        let policies = FieldPolicies::parse([
            ("price", "max"),
            ("stock", "min"),
            ("note", "lww"),
            ("tags", "union"),
            ("label", "max"),
        ])
        .unwrap();
        let m = auto_merge(&a, &b, &store, &policies).unwrap();
        let s = m.state();
        assert_eq!(s["price"], Value::from(5.0));
        assert_eq!(s["stock"], Value::from(7i64));
        assert_eq!(s["note"], Value::from("b"));
        assert_eq!(s["tags"], Value::from(json!(["x", "y", "z"])));
        // Non-numeric comparison falls back to B.
        assert_eq!(s["label"], Value::from(3i64));
        assert_eq!(s["strategy"], Value::from("auto"));
    }

    #[test]
    fn max_tie_takes_b() {
        let a = Value::from(json!({"v": 1}));
        let b = Value::from(json!({"v": 1.0}));
        assert_eq!(resolve_field("k", FieldPolicy::Max, Value::from(2.0), Value::from(2i64)).unwrap(), Value::from(2i64));
        // Objects are non-numeric.
        assert_eq!(resolve_field("k", FieldPolicy::Min, a, b.clone()).unwrap(), b);
    }

    #[test]
    fn union_coerces_scalars() {
        let merged = union(Value::from("x"), Value::from(json!(["x", "y"]))).unwrap();
        assert_eq!(merged, Value::from(json!(["x", "y"])));
    }

    #[test]
    fn auto_merge_is_deterministic() {
        let (store, a, b) = fork(json!({"price": 4.0}), json!({"price": 5.0}));
        let policies = FieldPolicies::parse([("price", "max")]).unwrap();
        let m1 = auto_merge(&a, &b, &store, &policies).unwrap();
        let m2 = auto_merge(&a, &b, &store, &policies).unwrap();
        assert_eq!(m1.hash(), m2.hash());
    }
}
