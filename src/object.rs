//! The three object variants and their canonical encoding.
//!
//! Every object is framed as `<type> <decimal-length>\0<payload>` before it is
//! hashed or compressed. [`GitObject::serialize`] produces the payload and
//! [`GitObject::deserialize`] is its inverse for a given [`ObjectType`].

use std::{fmt::Display, ops::Deref, str::FromStr};

use derive_more::Display as DeriveDisplay;

use crate::{object_id::ObjectId, Error, Result};

pub mod commit;
pub mod tree;

pub use commit::{Commit, Signature};
pub use tree::{EntryMode, Tree, TreeEntry};

/// The type tag written into an object header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
        }
    }
}

impl Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            "commit" => Ok(ObjectType::Commit),
            other => Err(Error::UnsupportedType(other.to_owned())),
        }
    }
}

/// A payload that does not decode as the object type it claims to be.
#[derive(Debug, Clone, PartialEq, Eq, DeriveDisplay)]
#[display(fmt = "{}", _0)]
pub struct Malformed(pub String);

impl std::error::Error for Malformed {}

impl Malformed {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Raw, uninterpreted file content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blob {
    data: Vec<u8>,
}

impl Blob {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// A blob, tree or commit, independent of any id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitObject {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
}

impl GitObject {
    pub fn object_type(&self) -> ObjectType {
        match self {
            GitObject::Blob(_) => ObjectType::Blob,
            GitObject::Tree(_) => ObjectType::Tree,
            GitObject::Commit(_) => ObjectType::Commit,
        }
    }

    /// The canonical payload bytes, without the header.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            GitObject::Blob(blob) => blob.data.clone(),
            GitObject::Tree(tree) => tree.serialize(),
            GitObject::Commit(commit) => commit.serialize(),
        }
    }

    pub fn deserialize(object_type: ObjectType, payload: &[u8]) -> Result<Self, Malformed> {
        Ok(match object_type {
            ObjectType::Blob => GitObject::Blob(Blob::new(payload)),
            ObjectType::Tree => GitObject::Tree(Tree::deserialize(payload)?),
            ObjectType::Commit => GitObject::Commit(Commit::deserialize(payload)?),
        })
    }

    /// The header-framed bytes that are hashed and, compressed, written to disk.
    pub fn frame(&self) -> Vec<u8> {
        frame(self.object_type(), &self.serialize())
    }

    /// The id this object has, computed from its own contents.
    pub fn id(&self) -> ObjectId {
        ObjectId::digest(&self.frame())
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            GitObject::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            GitObject::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            GitObject::Commit(commit) => Some(commit),
            _ => None,
        }
    }
}

impl From<Blob> for GitObject {
    fn from(blob: Blob) -> Self {
        GitObject::Blob(blob)
    }
}

impl From<Tree> for GitObject {
    fn from(tree: Tree) -> Self {
        GitObject::Tree(tree)
    }
}

impl From<Commit> for GitObject {
    fn from(commit: Commit) -> Self {
        GitObject::Commit(commit)
    }
}

/// `<type> <len>\0<payload>`
pub fn frame(object_type: ObjectType, payload: &[u8]) -> Vec<u8> {
    let header = format!("{} {}\0", object_type, payload.len());
    let mut out = Vec::with_capacity(header.len() + payload.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(payload);
    out
}

/// `hash(type, payload) = sha1("<type> <len>\0" + payload)`
pub fn hash(object_type: ObjectType, payload: &[u8]) -> ObjectId {
    ObjectId::digest(&frame(object_type, payload))
}

/// Splits framed bytes into their type and payload, checking the declared length.
/// `id` is only used to label errors.
pub fn unframe(id: ObjectId, framed: &[u8]) -> Result<(ObjectType, &[u8])> {
    let corrupt = |reason: &str| Error::Corrupt {
        id,
        reason: reason.to_owned(),
    };
    let nul = framed
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| corrupt("missing NUL after header"))?;
    let header =
        std::str::from_utf8(&framed[..nul]).map_err(|_| corrupt("header is not UTF-8"))?;
    let (type_name, len) = header
        .split_once(' ')
        .ok_or_else(|| corrupt("header has no length"))?;
    let object_type: ObjectType = type_name.parse()?;
    if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) {
        return Err(corrupt("header length is not a number"));
    }
    let len: usize = len.parse().map_err(|_| corrupt("header length is out of range"))?;
    let payload = &framed[nul + 1..];
    if payload.len() != len {
        return Err(corrupt("header length disagrees with payload"));
    }
    Ok((object_type, payload))
}

/// An object together with the id it is addressed by.
///
/// Values built with [`Stored::new`] carry the hash of their own contents;
/// values loaded from a store carry the id they were requested with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored<T = GitObject> {
    id: ObjectId,
    value: T,
}

impl<T> Stored<T> {
    pub(crate) fn with_id(id: ObjectId, value: T) -> Self {
        Self { id, value }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Stored<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl Stored<GitObject> {
    pub fn new(object: GitObject) -> Self {
        Self {
            id: object.id(),
            value: object,
        }
    }

    pub fn into_commit(self) -> Result<Stored<Commit>> {
        match self.value {
            GitObject::Commit(commit) => Ok(Stored::with_id(self.id, commit)),
            other => Err(Error::UnexpectedType {
                id: self.id,
                expected: ObjectType::Commit,
                found: other.object_type(),
            }),
        }
    }

    pub fn into_tree(self) -> Result<Stored<Tree>> {
        match self.value {
            GitObject::Tree(tree) => Ok(Stored::with_id(self.id, tree)),
            other => Err(Error::UnexpectedType {
                id: self.id,
                expected: ObjectType::Tree,
                found: other.object_type(),
            }),
        }
    }
}

impl Stored<Commit> {
    pub fn from_commit(commit: Commit) -> Self {
        Self {
            id: commit.id(),
            value: commit,
        }
    }
}

impl From<Stored<Commit>> for Stored<GitObject> {
    fn from(commit: Stored<Commit>) -> Self {
        Stored::with_id(commit.id, GitObject::Commit(commit.value))
    }
}

#[test]
fn test_blob_ids_match_git() {
    let empty = GitObject::Blob(Blob::default());
    assert_eq!(empty.id().to_string(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    let hello = GitObject::Blob(Blob::new(&b"hello\n"[..]));
    assert_eq!(hello.id().to_string(), "ce013625030ba8dba906f756967f9e9ca394464a");
    assert_eq!(hello.id(), hash(ObjectType::Blob, b"hello\n"));
}

#[test]
fn test_unframe() {
    let id = ObjectId::from_bytes([0; 20]);
    let (ty, payload) = unframe(id, b"blob 5\0hello").unwrap();
    assert_eq!(ty, ObjectType::Blob);
    assert_eq!(payload, b"hello");

    assert!(matches!(
        unframe(id, b"tag 5\0hello"),
        Err(Error::UnsupportedType(t)) if t == "tag"
    ));
    assert!(matches!(unframe(id, b"blob 4\0hello"), Err(Error::Corrupt { .. })));
    assert!(matches!(unframe(id, b"blob 5hello"), Err(Error::Corrupt { .. })));
    assert!(matches!(unframe(id, b"blob\0"), Err(Error::Corrupt { .. })));
    for header in [&b"blob +5\0hello"[..], b"blob  5\0hello", b"blob 5 \0hello", b"blob \0"] {
        assert!(
            matches!(unframe(id, header), Err(Error::Corrupt { .. })),
            "{:?}",
            String::from_utf8_lossy(header)
        );
    }
}

#[test]
fn test_type_names() {
    for ty in [ObjectType::Blob, ObjectType::Tree, ObjectType::Commit] {
        assert_eq!(ty.as_str().parse::<ObjectType>().unwrap(), ty);
    }
}
