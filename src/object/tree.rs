use std::collections::BTreeMap;

use crate::object::{Malformed, ObjectType};
use crate::object_id::ObjectId;
use crate::{Error, Result};

/// What is wrong with `name` as a tree entry name, if anything. Paths are
/// split on `/` and entries end at a NUL, so neither may appear in a name.
pub(crate) fn name_problem(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        Some("is empty")
    } else if name.contains('/') {
        Some("contains '/'")
    } else if name.contains('\0') {
        Some("contains a NUL byte")
    } else {
        None
    }
}

/// The kind of object a tree entry points at, written as an octal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryMode {
    Tree,
    Blob,
    Executable,
    Symlink,
    Gitlink,
}

impl EntryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMode::Tree => "40000",
            EntryMode::Blob => "100644",
            EntryMode::Executable => "100755",
            EntryMode::Symlink => "120000",
            EntryMode::Gitlink => "160000",
        }
    }

    fn parse(s: &[u8]) -> Option<Self> {
        match s {
            b"40000" => Some(EntryMode::Tree),
            b"100644" => Some(EntryMode::Blob),
            b"100755" => Some(EntryMode::Executable),
            b"120000" => Some(EntryMode::Symlink),
            b"160000" => Some(EntryMode::Gitlink),
            _ => None,
        }
    }

    /// The object type stored behind entries of this mode, if it lives in this repository.
    pub fn object_type(&self) -> Option<ObjectType> {
        match self {
            EntryMode::Tree => Some(ObjectType::Tree),
            EntryMode::Blob | EntryMode::Executable | EntryMode::Symlink => Some(ObjectType::Blob),
            EntryMode::Gitlink => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub mode: EntryMode,
    pub id: ObjectId,
}

/// A directory listing. Entries are keyed by name, so a name appears at most
/// once and iteration is in byte order of the names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree {
    entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the entry called `name`, returning the previous one.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        mode: EntryMode,
        id: ObjectId,
    ) -> Result<Option<TreeEntry>> {
        let name = name.into();
        if let Some(problem) = name_problem(&name) {
            return Err(Error::InvalidPath(format!(
                "tree entry name {:?} {}",
                name, problem
            )));
        }
        Ok(self
            .entries
            .insert(name.clone(), TreeEntry { name, mode, id }))
    }

    pub fn remove(&mut self, name: &str) -> Option<TreeEntry> {
        self.entries.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `<mode> <name>\0<20 raw id bytes>` per entry, in name byte order.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in self.entries.values() {
            out.extend_from_slice(entry.mode.as_str().as_bytes());
            out.push(b' ');
            out.extend_from_slice(entry.name.as_bytes());
            out.push(0);
            out.extend_from_slice(entry.id.as_bytes());
        }
        out
    }

    pub fn deserialize(mut payload: &[u8]) -> Result<Self, Malformed> {
        let mut entries = BTreeMap::new();
        while !payload.is_empty() {
            let space = payload
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| Malformed::new("tree entry has no mode"))?;
            let mode = EntryMode::parse(&payload[..space]).ok_or_else(|| {
                Malformed::new(format!(
                    "unknown tree entry mode {:?}",
                    String::from_utf8_lossy(&payload[..space])
                ))
            })?;
            payload = &payload[space + 1..];

            let nul = payload
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| Malformed::new("tree entry name is not terminated"))?;
            let name = std::str::from_utf8(&payload[..nul])
                .map_err(|_| Malformed::new("tree entry name is not UTF-8"))?
                .to_owned();
            payload = &payload[nul + 1..];

            if payload.len() < ObjectId::LEN {
                return Err(Malformed::new("tree entry id is truncated"));
            }
            let id = ObjectId::from_slice(&payload[..ObjectId::LEN])
                .ok_or_else(|| Malformed::new("tree entry id is truncated"))?;
            payload = &payload[ObjectId::LEN..];

            if let Some(problem) = name_problem(&name) {
                return Err(Malformed::new(format!(
                    "tree entry name {:?} {}",
                    name, problem
                )));
            }
            if entries.contains_key(&name) {
                return Err(Malformed::new(format!("duplicate tree entry {:?}", name)));
            }
            entries.insert(name.clone(), TreeEntry { name, mode, id });
        }
        Ok(Self { entries })
    }
}

#[cfg(test)]
fn blob_id(content: &[u8]) -> ObjectId {
    crate::object::hash(ObjectType::Blob, content)
}

#[test]
fn test_tree_insertion_order_does_not_matter() {
    let mut a = Tree::new();
    a.insert("zeta", EntryMode::Blob, blob_id(b"z")).unwrap();
    a.insert("alpha", EntryMode::Blob, blob_id(b"a")).unwrap();
    a.insert("Beta", EntryMode::Tree, blob_id(b"b")).unwrap();

    let mut b = Tree::new();
    b.insert("alpha", EntryMode::Blob, blob_id(b"a")).unwrap();
    b.insert("Beta", EntryMode::Tree, blob_id(b"b")).unwrap();
    b.insert("zeta", EntryMode::Blob, blob_id(b"z")).unwrap();

    assert_eq!(a.serialize(), b.serialize());
    let names: Vec<&str> = a.entries().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Beta", "alpha", "zeta"]);
}

#[test]
fn test_tree_round_trip() {
    let mut tree = Tree::new();
    tree.insert("page", EntryMode::Blob, blob_id(b"text")).unwrap();
    tree.insert("run.sh", EntryMode::Executable, blob_id(b"#!/bin/sh")).unwrap();
    tree.insert("sub", EntryMode::Tree, blob_id(b"not really a tree")).unwrap();
    let bytes = tree.serialize();
    assert_eq!(Tree::deserialize(&bytes).unwrap(), tree);
}

#[test]
fn test_tree_matches_git() {
    // `git mktree` with a single "hello" blob containing "hello\n".
    let mut tree = Tree::new();
    tree.insert("hello", EntryMode::Blob, blob_id(b"hello\n")).unwrap();
    let id = crate::object::hash(ObjectType::Tree, &tree.serialize());
    assert_eq!(id.to_string(), "b4d01e9b0c4a9356736dfddf8830ba9a54f5271c");
}

#[test]
fn test_tree_rejects_malformed() {
    assert!(Tree::deserialize(b"100644 name").is_err());
    assert!(Tree::deserialize(b"100644 name\0short").is_err());
    assert!(Tree::deserialize(b"777 name\0aaaaaaaaaaaaaaaaaaaa").is_err());

    let mut dup = Vec::new();
    for _ in 0..2 {
        dup.extend_from_slice(b"100644 a\0");
        dup.extend_from_slice(&[7u8; 20]);
    }
    assert!(Tree::deserialize(&dup).is_err());
}

#[test]
fn test_insert_replaces() {
    let mut tree = Tree::new();
    assert!(tree.insert("a", EntryMode::Blob, blob_id(b"1")).unwrap().is_none());
    let old = tree.insert("a", EntryMode::Blob, blob_id(b"2")).unwrap().unwrap();
    assert_eq!(old.id, blob_id(b"1"));
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_entry_names_are_checked() {
    let mut tree = Tree::new();
    for bad in ["", "a/b", "a\0b", "/"] {
        assert!(
            matches!(tree.insert(bad, EntryMode::Blob, blob_id(b"x")), Err(Error::InvalidPath(_))),
            "{:?}",
            bad
        );
    }
    assert!(tree.is_empty());

    // what insert accepts always survives a round trip
    tree.insert("a b.txt", EntryMode::Blob, blob_id(b"x")).unwrap();
    tree.insert("ünïcode", EntryMode::Tree, blob_id(b"y")).unwrap();
    assert_eq!(Tree::deserialize(&tree.serialize()).unwrap(), tree);

    let mut slash = b"100644 a/b\0".to_vec();
    slash.extend_from_slice(&[7u8; 20]);
    assert!(Tree::deserialize(&slash).is_err());

    let mut empty = b"100644 \0".to_vec();
    empty.extend_from_slice(&[7u8; 20]);
    assert!(Tree::deserialize(&empty).is_err());
}
