use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::TypeError;

/// Content-addressed identifier for a block or Merkle node.
///
/// A `BlockHash` is the SHA-256 digest of canonical bytes. Identical content
/// always produces the same hash, which is what makes blocks deduplicatable
/// and verifiable. On the wire it is a lowercase 64-character hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    /// Hash raw bytes with SHA-256.
    pub fn digest(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Create a `BlockHash` from a pre-computed digest.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation (64 lowercase characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    ///
    /// Uppercase input is accepted; the canonical rendering is always
    /// lowercase.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.short_hex())
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for BlockHash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for BlockHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<BlockHash> for [u8; 32] {
    fn from(hash: BlockHash) -> Self {
        hash.0
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let data = b"hello world";
        assert_eq!(BlockHash::digest(data), BlockHash::digest(data));
    }

    #[test]
    fn different_data_produces_different_hashes() {
        assert_ne!(BlockHash::digest(b"hello"), BlockHash::digest(b"world"));
    }

    #[test]
    fn empty_input_matches_known_sha256() {
        assert_eq!(
            BlockHash::digest(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hex_roundtrip() {
        let hash = BlockHash::digest(b"test");
        let parsed = BlockHash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        let hash = BlockHash::digest(b"test");
        let parsed: BlockHash = hash.to_hex().to_uppercase().parse().unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn rejects_short_input() {
        let err = BlockHash::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn rejects_non_hex() {
        assert!(matches!(
            BlockHash::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn display_is_full_lowercase_hex() {
        let hash = BlockHash::digest(b"test");
        let display = format!("{hash}");
        assert_eq!(display.len(), 64);
        assert_eq!(display, display.to_lowercase());
    }

    #[test]
    fn serde_uses_hex_string() {
        let hash = BlockHash::digest(b"serde test");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        let parsed: BlockHash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn ordering_matches_hex_ordering() {
        let a = BlockHash::digest(b"a");
        let b = BlockHash::digest(b"b");
        assert_eq!(a.cmp(&b), a.to_hex().cmp(&b.to_hex()));
    }
}
