use sha2::{Digest, Sha256};

use foodblock_types::BlockHash;

/// SHA-256 content hasher.
///
/// Block identity is the plain SHA-256 of canonical bytes, with no domain
/// tag, so that any conforming implementation can recompute it. Merkle
/// interior nodes hash the concatenated lowercase hex of their two children,
/// smaller first, which makes a node independent of sibling order.
pub struct ContentHasher;

impl ContentHasher {
    /// Hash raw bytes.
    pub fn hash(data: &[u8]) -> BlockHash {
        BlockHash::digest(data)
    }

    /// Hash the UTF-8 bytes of a string.
    pub fn hash_str(data: &str) -> BlockHash {
        BlockHash::digest(data.as_bytes())
    }

    /// Verify that data produces the expected hash.
    pub fn verify(data: &[u8], expected: &BlockHash) -> bool {
        Self::hash(data) == *expected
    }

    /// Hash of the empty string, the root of an empty Merkle tree.
    pub fn empty_root() -> BlockHash {
        BlockHash::digest(b"")
    }

    /// Parent of two Merkle nodes: `SHA256(min_hex || max_hex)`.
    pub fn hash_pair(a: &BlockHash, b: &BlockHash) -> BlockHash {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let mut hasher = Sha256::new();
        hasher.update(first.to_hex().as_bytes());
        hasher.update(second.to_hex().as_bytes());
        BlockHash::from_hash(hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"hello world";
        assert_eq!(ContentHasher::hash(data), ContentHasher::hash(data));
    }

    #[test]
    fn hash_str_matches_bytes() {
        assert_eq!(ContentHasher::hash_str("abc"), ContentHasher::hash(b"abc"));
    }

    #[test]
    fn known_vector() {
        assert_eq!(
            ContentHasher::hash(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn verify_correct_data() {
        let id = ContentHasher::hash(b"test data");
        assert!(ContentHasher::verify(b"test data", &id));
    }

    #[test]
    fn verify_incorrect_data() {
        let id = ContentHasher::hash(b"original");
        assert!(!ContentHasher::verify(b"tampered", &id));
    }

    #[test]
    fn pair_hash_is_order_independent() {
        let a = ContentHasher::hash(b"a");
        let b = ContentHasher::hash(b"b");
        assert_eq!(ContentHasher::hash_pair(&a, &b), ContentHasher::hash_pair(&b, &a));
    }

    #[test]
    fn pair_hash_is_hex_concatenation() {
        let a = ContentHasher::hash(b"a");
        let b = ContentHasher::hash(b"b");
        let (lo, hi) = if a.to_hex() < b.to_hex() { (a, b) } else { (b, a) };
        let expected = ContentHasher::hash_str(&format!("{}{}", lo.to_hex(), hi.to_hex()));
        assert_eq!(ContentHasher::hash_pair(&a, &b), expected);
    }
}
