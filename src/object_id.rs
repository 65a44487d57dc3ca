use crate::{hex, Error};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use std::{fmt::Display, str::FromStr};

/// An identifier for a particular object.
/// Under the hood, this is a [`sha1`] digest of the object's framed bytes.
///
/// It is displayed in lowercase hexadecimal format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    pub const LEN: usize = 20;

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Hashes an already framed `<type> <len>\0<payload>` byte string.
    pub fn digest(framed: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(framed);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    /// The `(directory, file)` pair a loose object with this id is stored under.
    pub fn shard(&self) -> (String, String) {
        let mut s = hex::encode(&self.0);
        let rest = s.split_off(2);
        (s, rest)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; 20] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 20];
        hex::decode_into(s, &mut bytes).ok_or_else(|| Error::InvalidObjectId(s.to_owned()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[test]
fn test_digest_matches_git() {
    let id = ObjectId::digest(b"blob 0\0");
    assert_eq!(id.to_string(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
}

#[test]
fn test_parse_and_shard() {
    let id: ObjectId = "ce013625030ba8dba906f756967f9e9ca394464a".parse().unwrap();
    let (dir, file) = id.shard();
    assert_eq!(dir, "ce");
    assert_eq!(file, "013625030ba8dba906f756967f9e9ca394464a");
    assert!("ce01".parse::<ObjectId>().is_err());
}

#[test]
fn test_serde_as_hex() {
    let id = ObjectId::from_bytes([0xab; 20]);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", "ab".repeat(20)));
    let back: ObjectId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}
