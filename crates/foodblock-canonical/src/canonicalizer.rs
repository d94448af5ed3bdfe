use std::collections::HashSet;
use std::fmt;
use std::fmt::Write as _;

use unicode_normalization::UnicodeNormalization;

use foodblock_types::{Map, Value};

use crate::error::{CanonicalResult, CanonicalizationError};
use crate::number::format_number;

/// Maximum nesting depth accepted for `state` and `refs` values.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Canonical bytes for a block's `(type, state, refs)` triple.
///
/// This is the exact input to the block hash. The triple is encoded as the
/// object `{"refs": .., "state": .., "type": ..}`. Arrays anywhere below an
/// object key named `refs` are treated as sets, including one nested in
/// `state`.
pub fn canonical(block_type: &str, state: &Map, refs: &Map) -> CanonicalResult<Vec<u8>> {
    canonical_string(block_type, state, refs).map(String::into_bytes)
}

/// [`canonical`] as a `String`.
pub fn canonical_string(block_type: &str, state: &Map, refs: &Map) -> CanonicalResult<String> {
    let mut writer = Writer::default();
    writer.out.push('{');
    writer.out.push_str("\"refs\":");
    writer.write_object(refs, &Path::root().push_field("refs"), true, 1)?;
    writer.out.push_str(",\"state\":");
    writer.write_object(state, &Path::root().push_field("state"), false, 1)?;
    writer.out.push_str(",\"type\":");
    writer.write_string(block_type);
    writer.out.push('}');
    Ok(writer.out)
}

/// Canonical text of a single value in `state` context.
///
/// A bare `null` renders as `null`; nested `null` entries are omitted as in
/// [`canonical`].
pub fn canonical_value(value: &Value) -> CanonicalResult<String> {
    render_value(value, false)
}

/// Canonical text of a single value in `refs` context (arrays are sets).
pub fn canonical_ref_value(value: &Value) -> CanonicalResult<String> {
    render_value(value, true)
}

fn render_value(value: &Value, in_refs: bool) -> CanonicalResult<String> {
    if value.is_null() {
        return Ok("null".to_string());
    }
    let mut writer = Writer::default();
    writer.write_value(value, &Path::root(), in_refs, 0)?;
    Ok(writer.out)
}

/// JSON path used in error messages.
#[derive(Debug, Clone)]
struct Path {
    segments: Vec<String>,
}

impl Path {
    fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    fn push_field(&self, field: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(field.to_string());
        Self { segments }
    }

    fn push_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(format!("[{index}]"));
        Self { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "root")
        } else {
            write!(f, "{}", self.segments.join("."))
        }
    }
}

#[derive(Default)]
struct Writer {
    out: String,
}

impl Writer {
    /// Callers must not pass `Value::Null`; null entries are filtered by the
    /// enclosing object or array.
    fn write_value(
        &mut self,
        value: &Value,
        path: &Path,
        in_refs: bool,
        depth: usize,
    ) -> CanonicalResult<()> {
        match value {
            Value::Null => {}
            Value::Bool(true) => self.out.push_str("true"),
            Value::Bool(false) => self.out.push_str("false"),
            Value::Number(n) => {
                let text = format_number(*n)
                    .ok_or_else(|| CanonicalizationError::NonFiniteNumber(path.to_string()))?;
                self.out.push_str(&text);
            }
            Value::String(s) => self.write_string(s),
            Value::Array(items) => self.write_array(items, path, in_refs, depth + 1)?,
            Value::Object(map) => self.write_object(map, path, in_refs, depth + 1)?,
        }
        Ok(())
    }

    fn write_object(
        &mut self,
        map: &Map,
        path: &Path,
        in_refs: bool,
        depth: usize,
    ) -> CanonicalResult<()> {
        check_depth(path, depth)?;

        // Entries stay in raw key order; only the emitted key is normalized.
        let mut seen = HashSet::new();
        self.out.push('{');
        for (i, (raw, value)) in map.iter().filter(|(_, v)| !v.is_null()).enumerate() {
            let key: String = raw.nfc().collect();
            if !seen.insert(key.clone()) {
                return Err(CanonicalizationError::DuplicateKey {
                    path: path.to_string(),
                    key,
                });
            }
            if i > 0 {
                self.out.push(',');
            }
            self.write_escaped(&key);
            self.out.push(':');
            let child_in_refs = in_refs || raw == "refs";
            self.write_value(value, &path.push_field(&key), child_in_refs, depth)?;
        }
        self.out.push('}');
        Ok(())
    }

    fn write_array(
        &mut self,
        items: &[Value],
        path: &Path,
        in_refs: bool,
        depth: usize,
    ) -> CanonicalResult<()> {
        check_depth(path, depth)?;

        let mut parts = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            if item.is_null() {
                continue;
            }
            let mut child = Writer::default();
            child.write_value(item, &path.push_index(idx), in_refs, depth)?;
            parts.push(child.out);
        }
        if in_refs {
            parts.sort();
        }

        self.out.push('[');
        self.out.push_str(&parts.join(","));
        self.out.push(']');
        Ok(())
    }

    fn write_string(&mut self, s: &str) {
        let normalized: String = s.nfc().collect();
        self.write_escaped(&normalized);
    }

    fn write_escaped(&mut self, s: &str) {
        self.out.push('"');
        for c in s.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c if (c as u32) < 0x20 => {
                    let _ = write!(self.out, "\\u{:04x}", c as u32);
                }
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }
}

fn check_depth(path: &Path, depth: usize) -> CanonicalResult<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(CanonicalizationError::NestingTooDeep {
            path: path.to_string(),
            limit: MAX_NESTING_DEPTH,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> Map {
        match Value::from(value) {
            Value::Object(m) => m,
            other => panic!("expected object, got {}", other.kind()),
        }
    }

    fn canon(t: &str, state: serde_json::Value, refs: serde_json::Value) -> String {
        canonical_string(t, &map(state), &map(refs)).unwrap()
    }

    #[test]
    fn golden_product_block() {
        let text = canon(
            "substance.product",
            json!({"price": 4.5, "name": "Bread"}),
            json!({}),
        );
        assert_eq!(
            text,
            r#"{"refs":{},"state":{"name":"Bread","price":4.5},"type":"substance.product"}"#
        );
    }

    #[test]
    fn keys_sorted_at_every_depth() {
        let text = canon("t", json!({"b": {"z": 1, "a": 2}, "a": 0}), json!({}));
        assert_eq!(text, r#"{"refs":{},"state":{"a":0,"b":{"a":2,"z":1}},"type":"t"}"#);
    }

    #[test]
    fn nulls_omitted_recursively() {
        let with_nulls = canon("t", json!({"a": 1, "b": null, "c": {"d": null}}), json!({}));
        let without = canon("t", json!({"a": 1, "c": {}}), json!({}));
        assert_eq!(with_nulls, without);
    }

    #[test]
    fn null_array_elements_omitted() {
        let text = canon("t", json!({"xs": [1, null, 2]}), json!({}));
        assert!(text.contains(r#""xs":[1,2]"#));
    }

    #[test]
    fn refs_arrays_are_sets() {
        let a = canon("t", json!({}), json!({"inputs": ["b", "a"]}));
        let b = canon("t", json!({}), json!({"inputs": ["a", "b"]}));
        assert_eq!(a, b);
        assert!(a.contains(r#""inputs":["a","b"]"#));
    }

    #[test]
    fn state_arrays_keep_order() {
        let a = canon("t", json!({"steps": ["b", "a"]}), json!({}));
        let b = canon("t", json!({"steps": ["a", "b"]}), json!({}));
        assert_ne!(a, b);
    }

    #[test]
    fn nested_refs_key_arrays_are_sets() {
        let a = canon("t", json!({"refs": ["b", "a"]}), json!({}));
        assert_eq!(a, r#"{"refs":{},"state":{"refs":["a","b"]},"type":"t"}"#);
        let deep = canon("t", json!({"meta": {"refs": {"x": ["d", "c"]}}}), json!({}));
        assert!(deep.contains(r#""x":["c","d"]"#));
        let sibling = canon("t", json!({"refs": [], "steps": ["b", "a"]}), json!({}));
        assert!(sibling.contains(r#""steps":["b","a"]"#));
    }

    #[test]
    fn keys_keep_raw_order_after_normalization() {
        // Raw "e\u{301}x" sorts before "f"; composed "\u{e9}x" would not.
        let text = canon("t", json!({"e\u{0301}x": 1, "f": 2}), json!({}));
        assert_eq!(text, "{\"refs\":{},\"state\":{\"\u{e9}x\":1,\"f\":2},\"type\":\"t\"}");
    }

    #[test]
    fn keys_colliding_after_normalization_fail() {
        let mut state = Map::new();
        state.insert("cafe\u{0301}".into(), Value::from(1.0));
        state.insert("caf\u{00e9}".into(), Value::from(2.0));
        let err = canonical_string("t", &state, &Map::new()).unwrap_err();
        assert_eq!(
            err,
            CanonicalizationError::DuplicateKey {
                path: "state".into(),
                key: "caf\u{00e9}".into(),
            }
        );
    }

    #[test]
    fn strings_are_nfc_normalized() {
        // "e" + combining acute vs precomposed "é".
        let decomposed = canon("t", json!({"name": "Cafe\u{0301}"}), json!({}));
        let composed = canon("t", json!({"name": "Caf\u{00e9}"}), json!({}));
        assert_eq!(decomposed, composed);
    }

    #[test]
    fn keys_are_nfc_normalized() {
        let decomposed = canon("t", json!({"cafe\u{0301}": 1}), json!({}));
        let composed = canon("t", json!({"caf\u{00e9}": 1}), json!({}));
        assert_eq!(decomposed, composed);
    }

    #[test]
    fn control_characters_escaped() {
        let text = canonical_value(&Value::from("a\"b\\c\nd\u{1}e")).unwrap();
        assert_eq!(text, r#""a\"b\\c\nd\u0001e""#);
    }

    #[test]
    fn non_ascii_emitted_verbatim() {
        let text = canonical_value(&Value::from("Brød ✓")).unwrap();
        assert_eq!(text, "\"Brød ✓\"");
    }

    #[test]
    fn numbers_use_ecmascript_format() {
        let text = canon("t", json!({"a": 5.0, "b": 1e21, "c": 0.0000001}), json!({}));
        assert!(text.contains(r#""a":5,"b":1e+21,"c":1e-7"#));
    }

    #[test]
    fn negative_zero_is_zero() {
        let mut state = Map::new();
        state.insert("n".into(), Value::Number(-0.0));
        let text = canonical_string("t", &state, &Map::new()).unwrap();
        assert!(text.contains(r#""n":0"#));
    }

    #[test]
    fn nan_fails_with_path() {
        let mut inner = Map::new();
        inner.insert("x".into(), Value::Number(f64::NAN));
        let mut state = Map::new();
        state.insert("nested".into(), Value::Object(inner));
        let err = canonical("t", &state, &Map::new()).unwrap_err();
        assert_eq!(
            err,
            CanonicalizationError::NonFiniteNumber("state.nested.x".into())
        );
    }

    #[test]
    fn infinity_in_array_fails() {
        let mut state = Map::new();
        state.insert(
            "xs".into(),
            Value::Array(vec![Value::Number(1.0), Value::Number(f64::INFINITY)]),
        );
        let err = canonical("t", &state, &Map::new()).unwrap_err();
        assert_eq!(err, CanonicalizationError::NonFiniteNumber("state.xs.[1]".into()));
    }

    #[test]
    fn excessive_nesting_fails() {
        let mut value = Value::from(1i64);
        for _ in 0..(MAX_NESTING_DEPTH + 5) {
            value = Value::Array(vec![value]);
        }
        let mut state = Map::new();
        state.insert("deep".into(), value);
        assert!(matches!(
            canonical("t", &state, &Map::new()),
            Err(CanonicalizationError::NestingTooDeep { .. })
        ));
    }

    #[test]
    fn bare_null_value() {
        assert_eq!(canonical_value(&Value::Null).unwrap(), "null");
    }

    #[test]
    fn ref_value_sorts_by_canonical_string() {
        let value = Value::from(json!(["c", "a", "b"]));
        assert_eq!(canonical_ref_value(&value).unwrap(), r#"["a","b","c"]"#);
        assert_eq!(canonical_value(&value).unwrap(), r#"["c","a","b"]"#);
    }

    proptest! {
        #[test]
        fn insertion_order_does_not_matter(
            entries in proptest::collection::vec(("[a-z]{1,6}", -1000i64..1000), 0..12)
        ) {
            let forward: Map = entries.iter().map(|(k, v)| (k.clone(), Value::from(*v))).collect();
            let reversed: Map = entries.iter().rev().map(|(k, v)| (k.clone(), Value::from(*v))).collect();
            // Later duplicates win in both maps only if the key set is unique.
            prop_assume!(forward == reversed);
            prop_assert_eq!(
                canonical("t", &forward, &Map::new()).unwrap(),
                canonical("t", &reversed, &Map::new()).unwrap()
            );
        }

        #[test]
        fn refs_permutation_does_not_matter(
            mut hashes in proptest::collection::vec("[0-9a-f]{8}", 1..8)
        ) {
            let mut refs_a = Map::new();
            refs_a.insert("inputs".into(), Value::Array(hashes.iter().map(|h| Value::from(h.as_str())).collect()));
            hashes.reverse();
            let mut refs_b = Map::new();
            refs_b.insert("inputs".into(), Value::Array(hashes.iter().map(|h| Value::from(h.as_str())).collect()));
            prop_assert_eq!(
                canonical("t", &Map::new(), &refs_a).unwrap(),
                canonical("t", &Map::new(), &refs_b).unwrap()
            );
        }
    }
}
