//! Descends from a commit's root tree along a [`TreePath`].

use crate::{
    object::{Commit, GitObject, Stored},
    object_store::ObjectStore,
    tree_path::TreePath,
    Error, Result,
};

/// How a path resolved at one commit.
///
/// Absence and structural invalidity are kept apart so callers decide
/// which of them they are willing to treat alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(Stored),
    /// Entry `missing` is not in the tree reached after `at` named segments.
    NotFound { at: usize, missing: String },
    /// A further lookup was needed but the object reached after `at` named segments is not a tree.
    Invalid { at: usize },
}

impl Resolution {
    pub fn found(self) -> Option<Stored> {
        match self {
            Resolution::Found(object) => Some(object),
            _ => None,
        }
    }

    /// Turns absence into [`Error::NotFound`] and invalidity into [`Error::InvalidTree`].
    pub fn into_result(self, path: &TreePath) -> Result<Stored> {
        match self {
            Resolution::Found(object) => Ok(object),
            Resolution::NotFound { .. } => Err(Error::NotFound {
                path: path.to_string(),
            }),
            Resolution::Invalid { .. } => Err(Error::InvalidTree {
                path: path.to_string(),
            }),
        }
    }
}

/// Walks `path` from `commit`'s root tree. An empty path yields the root tree.
///
/// Errors are only storage failures; a missing entry or a non-tree in the way
/// is reported through [`Resolution`].
pub fn resolve<S>(store: &S, commit: &Commit, path: &TreePath) -> Result<Resolution>
where
    S: ObjectStore + ?Sized,
{
    let mut current = store.get(&commit.tree)?;
    let mut depth = 0;
    for segment in path.segments() {
        if segment.is_empty() {
            continue;
        }
        let tree = match current.get() {
            GitObject::Tree(tree) => tree,
            _ => return Ok(Resolution::Invalid { at: depth }),
        };
        let entry = match tree.get(segment) {
            Some(entry) => entry,
            None => {
                return Ok(Resolution::NotFound {
                    at: depth,
                    missing: segment.clone(),
                })
            }
        };
        let child = entry.id;
        current = store.get(&child)?;
        depth += 1;
    }
    Ok(Resolution::Found(current))
}

/// [`resolve`], with absence and invalidity as errors.
pub fn find<S>(store: &S, commit: &Commit, path: &TreePath) -> Result<Stored>
where
    S: ObjectStore + ?Sized,
{
    resolve(store, commit, path)?.into_result(path)
}

#[cfg(test)]
pub(crate) mod fixture {
    use crate::object::{Blob, Commit, EntryMode, Signature, Tree};
    use crate::object_id::ObjectId;
    use crate::object_store::{in_memory::InMemoryObjectStore, ObjectStore};

    /// root: { a: blob "alpha", dir: { b: blob "beta" } }
    pub fn store_with_commit() -> (InMemoryObjectStore, Commit) {
        let mut store = InMemoryObjectStore::new();
        let a = store.insert(Blob::new(&b"alpha"[..])).unwrap();
        let b = store.insert(Blob::new(&b"beta"[..])).unwrap();
        let mut dir = Tree::new();
        dir.insert("b", EntryMode::Blob, b).unwrap();
        let dir = store.insert(dir).unwrap();
        let mut root = Tree::new();
        root.insert("a", EntryMode::Blob, a).unwrap();
        root.insert("dir", EntryMode::Tree, dir).unwrap();
        let root = store.insert(root).unwrap();
        (store, commit(root, Vec::new(), 1))
    }

    pub fn commit(tree: ObjectId, parents: Vec<ObjectId>, time: i64) -> Commit {
        let who = Signature::new("Wiki", "wiki@example.com", time);
        Commit {
            tree,
            parents,
            author: who.clone(),
            committer: who,
            extra_headers: Vec::new(),
            message: format!("revision at {}\n", time),
        }
    }
}

#[cfg(test)]
fn path(s: &[&str]) -> TreePath {
    TreePath::new(s.iter().copied()).unwrap()
}

#[test]
fn test_empty_path_is_root_tree() {
    let (store, commit) = fixture::store_with_commit();
    let root = find(&store, &commit, &TreePath::root()).unwrap();
    assert_eq!(root.id(), commit.tree);
    assert!(root.as_tree().is_some());
}

#[test]
fn test_found_missing_and_invalid() {
    let (store, commit) = fixture::store_with_commit();

    let a = find(&store, &commit, &path(&["a"])).unwrap();
    assert_eq!(a.as_blob().unwrap().data(), b"alpha");

    assert_eq!(
        resolve(&store, &commit, &path(&["b"])).unwrap(),
        Resolution::NotFound {
            at: 0,
            missing: "b".to_string()
        }
    );
    assert!(matches!(
        find(&store, &commit, &path(&["b"])),
        Err(Error::NotFound { path }) if path == "b"
    ));

    assert_eq!(
        resolve(&store, &commit, &path(&["a", "x"])).unwrap(),
        Resolution::Invalid { at: 1 }
    );
    assert!(matches!(
        find(&store, &commit, &path(&["a", "x"])),
        Err(Error::InvalidTree { .. })
    ));
}

#[test]
fn test_nested_and_directory_marker() {
    let (store, commit) = fixture::store_with_commit();
    let b = find(&store, &commit, &path(&["dir", "b"])).unwrap();
    assert_eq!(b.as_blob().unwrap().data(), b"beta");

    let dir = find(&store, &commit, &path(&["dir"])).unwrap();
    let marked = find(&store, &commit, &path(&["dir", ""])).unwrap();
    assert_eq!(dir, marked);

    // the marker is skipped before the tree check, so it is harmless after a blob
    let a = find(&store, &commit, &path(&["a", ""])).unwrap();
    assert!(a.as_blob().is_some());
}

#[test]
fn test_missing_object_propagates() {
    let (_, commit) = fixture::store_with_commit();
    let empty = crate::object_store::in_memory::InMemoryObjectStore::new();
    assert!(matches!(
        resolve(&empty, &commit, &TreePath::root()),
        Err(Error::ObjectNotFound(id)) if id == commit.tree
    ));
}
