//! Content digest type for content-addressable storage.
//!
//! A `Digest` is the sha256 of a blob's bytes and is the blob's identity:
//! two blobs with equal digests are treated as bit-identical content.

use crate::error::RelicError;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A sha256 content digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest {
    bytes: [u8; 32],
}

impl Digest {
    /// Create a new Digest from raw bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// The raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Convert to lowercase hexadecimal
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse from a 64-character hexadecimal string.
    ///
    /// Malformed input is a caller error, not a corruption signal.
    pub fn from_hex(hex_str: &str) -> Result<Self, RelicError> {
        let raw = hex::decode(hex_str).map_err(|e| {
            RelicError::invalid_argument(format!("invalid digest hex: {}", e))
        })?;
        if raw.len() != 32 {
            return Err(RelicError::invalid_argument(format!(
                "digest must be 32 bytes, got {}",
                raw.len()
            )));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&raw);
        Ok(Self { bytes })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = RelicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Digests are persisted as hex strings in index entries.
impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexVisitor;

        impl<'de> Visitor<'de> for HexVisitor {
            type Value = Digest;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 64-character hex string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Digest, E> {
                Digest::from_hex(v).map_err(|e| E::custom(e.to_string()))
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}
