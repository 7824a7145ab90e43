use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Length in bytes of an [`ObjectId`].
pub const OBJECT_ID_LEN: usize = 32;

/// Content-addressed identifier for a blob or node.
///
/// An `ObjectId` is a BLAKE3 hash. Identical content always produces the same
/// `ObjectId`, which is what makes chunks deduplicatable and verifiable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Compute an `ObjectId` from raw bytes (plain BLAKE3, no domain tag).
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create an `ObjectId` from a pre-computed hash.
    pub const fn from_hash(hash: [u8; OBJECT_ID_LEN]) -> Self {
        Self(hash)
    }

    /// Read an `ObjectId` from the first 32 bytes of `data`.
    pub fn from_slice(data: &[u8]) -> Result<Self, TypeError> {
        let bytes: [u8; OBJECT_ID_LEN] = data
            .get(..OBJECT_ID_LEN)
            .and_then(|s| s.try_into().ok())
            .ok_or(TypeError::InvalidLength {
                expected: OBJECT_ID_LEN,
                actual: data.len(),
            })?;
        Ok(Self(bytes))
    }

    /// The null object ID (all zeros). Represents "no object".
    pub const fn null() -> Self {
        Self([0u8; OBJECT_ID_LEN])
    }

    /// Returns `true` if this is the null object ID.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; OBJECT_ID_LEN]
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// The low-order 32 bits of the hash, little-endian.
    ///
    /// Used for content-defined decisions that need a uniformly distributed
    /// integer derived from the identity.
    pub fn low_u32(&self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != OBJECT_ID_LEN {
            return Err(TypeError::InvalidLength {
                expected: OBJECT_ID_LEN,
                actual: bytes.len(),
            });
        }
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; OBJECT_ID_LEN]> for ObjectId {
    fn from(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<ObjectId> for [u8; OBJECT_ID_LEN] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_is_deterministic() {
        let id1 = ObjectId::from_bytes(b"hello world");
        let id2 = ObjectId::from_bytes(b"hello world");
        assert_eq!(id1, id2);
    }

    #[test]
    fn from_bytes_matches_plain_blake3() {
        let id = ObjectId::from_bytes(b"abc");
        assert_eq!(id.as_bytes(), blake3::hash(b"abc").as_bytes());
    }

    #[test]
    fn null_is_all_zeros() {
        let null = ObjectId::null();
        assert!(null.is_null());
        assert_eq!(null.as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn hex_roundtrip() {
        let id = ObjectId::from_bytes(b"test");
        let parsed: ObjectId = id.to_hex().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn from_hex_rejects_short_input() {
        let err = ObjectId::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(matches!(
            ObjectId::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn from_slice_reads_prefix() {
        let id = ObjectId::from_bytes(b"prefix");
        let mut buf = id.as_bytes().to_vec();
        buf.extend_from_slice(b"trailing");
        assert_eq!(ObjectId::from_slice(&buf).unwrap(), id);
        assert!(ObjectId::from_slice(&buf[..10]).is_err());
    }

    #[test]
    fn low_u32_uses_first_four_bytes() {
        let mut raw = [0u8; 32];
        raw[0] = 0x01;
        raw[3] = 0x80;
        assert_eq!(ObjectId::from_hash(raw).low_u32(), 0x8000_0001);
    }

    #[test]
    fn short_hex_is_8_chars() {
        assert_eq!(ObjectId::from_bytes(b"test").short_hex().len(), 8);
    }

    #[test]
    fn serde_roundtrip() {
        let id = ObjectId::from_bytes(b"serde test");
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
