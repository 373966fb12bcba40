//! Shared types for the stoon store.

use bson::oid;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of the canonical hex encoding.
pub const OBJECT_ID_HEX_LEN: usize = 24;

/// A string that does not name an [`ObjectId`].
#[derive(Debug, thiserror::Error)]
#[error("{input:?} is not a {OBJECT_ID_HEX_LEN}-character hex object id: {reason}")]
pub struct ObjectIdError {
    input: String,
    #[source]
    reason: oid::Error,
}

impl ObjectIdError {
    /// The rejected text.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Opaque 12-byte document identifier (BSON object id layout: timestamp,
/// per-process random, counter).
///
/// Always serialized as its 24-character lowercase hex string, so snapshots
/// stay plain JSON. Ids parsed from text and freshly generated ids compare
/// equal whenever their canonical strings do.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(oid::ObjectId);

impl ObjectId {
    /// Generate a fresh id, unique within the process.
    pub fn new() -> Self {
        Self(oid::ObjectId::new())
    }

    /// Parse the 24-character hex form. Either letter case is accepted.
    pub fn parse_str(s: &str) -> Result<Self, ObjectIdError> {
        oid::ObjectId::parse_str(s)
            .map(Self)
            .map_err(|reason| ObjectIdError {
                input: s.to_owned(),
                reason,
            })
    }

    /// Canonical lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn object_id_uniqueness() {
        let ids: HashSet<ObjectId> = (0..10_000).map(|_| ObjectId::new()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn hex_is_fixed_width_lowercase() {
        let id = ObjectId::parse_str("ABABABABABABABABABABABAB").unwrap();
        let hex = id.to_hex();
        assert_eq!(hex.len(), OBJECT_ID_HEX_LEN);
        assert_eq!(hex, "abababababababababababab");
        assert_eq!(id.to_string(), hex);
        assert_eq!(format!("{id:?}"), "ObjectId(abababababababababababab)");
    }

    #[test]
    fn parsed_and_generated_ids_compare_equal() {
        let id = ObjectId::new();
        let parsed: ObjectId = id.to_hex().parse().unwrap();
        assert_eq!(parsed, id);

        let upper = ObjectId::parse_str(&id.to_hex().to_uppercase()).unwrap();
        assert_eq!(upper, id);
        assert_eq!(upper.to_hex(), id.to_hex());
    }

    #[test]
    fn parse_rejects_bad_input() {
        let err = ObjectId::parse_str("abc").unwrap_err();
        assert_eq!(err.input(), "abc");
        assert!(err.to_string().contains("\"abc\""));

        assert!(ObjectId::parse_str("zzzzzzzzzzzzzzzzzzzzzzzz").is_err());
        assert!(ObjectId::parse_str("0001020304050607080910111213").is_err());
        // 24 bytes but multi-byte chars must not panic
        assert!(ObjectId::parse_str("ééééééééééee").is_err());
    }

    #[test]
    fn serde_uses_canonical_string() {
        let id = ObjectId::parse_str("000102030405060708090a0b").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"000102030405060708090a0b\"");
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ObjectId>("\"nope\"").is_err());
        assert!(serde_json::from_str::<ObjectId>(r#"{"$oid": "000102030405060708090a0b"}"#).is_err());
    }
}
