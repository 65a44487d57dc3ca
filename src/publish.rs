//! Writing a new revision that changes one path.
//!
//! Objects are written leaves first (blob, trees, commit) so that nothing a
//! new commit references is missing once the commit exists. Publishing the
//! commit on a branch is left to [`Repository::publish_head`](crate::repository::Repository::publish_head).

use crate::{
    object::{Blob, Commit, EntryMode, GitObject, Signature, Stored, Tree},
    object_id::ObjectId,
    object_store::ObjectStore,
    tree_path::TreePath,
    Error, Result,
};

/// One change to one path.
#[derive(Debug, Clone)]
pub struct Revision<'a> {
    pub path: &'a TreePath,
    /// New content, or `None` to delete the path.
    pub content: Option<&'a [u8]>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

/// Writes `revision` on top of `parent` (or as a root commit) and returns the new commit.
pub fn write_revision<S>(
    store: &mut S,
    parent: Option<&Stored<Commit>>,
    revision: Revision<'_>,
) -> Result<Stored<Commit>>
where
    S: ObjectStore,
{
    let names: Vec<&str> = revision.path.names().collect();
    if names.is_empty() {
        return Err(Error::InvalidPath(String::from("cannot replace the root tree")));
    }
    let base = match parent {
        Some(parent) => Some(store.get_tree(&parent.tree)?.into_inner()),
        None => None,
    };
    let tree = match update(store, base, &names, revision.content, revision.path)? {
        Some(tree) => tree,
        None => store.insert(Tree::new())?,
    };

    let commit = Commit {
        tree,
        parents: parent.map(|p| vec![p.id()]).unwrap_or_default(),
        author: revision.author,
        committer: revision.committer,
        extra_headers: Vec::new(),
        message: revision.message,
    };
    let commit = Stored::from_commit(commit);
    store.put(&GitObject::Commit(commit.get().clone()))?;
    log::info!("wrote commit {} changing {}", commit.id(), revision.path);
    Ok(commit)
}

/// Applies the change below `tree` and writes the result. `None` means the
/// tree ended up empty and should be dropped from its parent.
fn update<S>(
    store: &mut S,
    tree: Option<Tree>,
    names: &[&str],
    content: Option<&[u8]>,
    path: &TreePath,
) -> Result<Option<ObjectId>>
where
    S: ObjectStore,
{
    let mut tree = tree.unwrap_or_default();
    let (name, rest) = match names.split_first() {
        Some(split) => split,
        None => return Err(Error::InvalidPath(path.to_string())),
    };
    let existing = tree.get(name).cloned();

    if rest.is_empty() {
        match content {
            Some(content) => {
                let id = store.insert(Blob::new(content))?;
                let mode = match existing.map(|e| e.mode) {
                    Some(EntryMode::Executable) => EntryMode::Executable,
                    _ => EntryMode::Blob,
                };
                tree.insert(*name, mode, id)?;
            }
            None => {
                if tree.remove(name).is_none() {
                    return Err(Error::NotFound {
                        path: path.to_string(),
                    });
                }
            }
        }
    } else {
        let subtree = match existing {
            Some(entry) if entry.mode == EntryMode::Tree => {
                Some(store.get_tree(&entry.id)?.into_inner())
            }
            Some(_) => {
                return Err(Error::InvalidTree {
                    path: path.to_string(),
                })
            }
            None if content.is_none() => {
                return Err(Error::NotFound {
                    path: path.to_string(),
                })
            }
            None => None,
        };
        match update(store, subtree, rest, content, path)? {
            Some(id) => {
                tree.insert(*name, EntryMode::Tree, id)?;
            }
            None => {
                tree.remove(name);
            }
        }
    }

    if tree.is_empty() {
        return Ok(None);
    }
    Ok(Some(store.insert(tree)?))
}

#[cfg(test)]
fn revision<'a>(path: &'a TreePath, content: Option<&'a [u8]>, time: i64) -> Revision<'a> {
    let who = Signature::new("Editor", "editor@example.com", time);
    Revision {
        path,
        content,
        author: who.clone(),
        committer: who,
        message: format!("edit {}\n", path),
    }
}

#[test]
fn test_write_nested_page() {
    use crate::object_store::in_memory::InMemoryObjectStore;
    use crate::resolve::find;

    let mut store = InMemoryObjectStore::new();
    let path = TreePath::parse("docs/guide/intro").unwrap();
    let c1 = write_revision(&mut store, None, revision(&path, Some(&b"hi"[..]), 1)).unwrap();
    assert!(c1.parents.is_empty());
    let page = find(&store, &c1, &path).unwrap();
    assert_eq!(page.as_blob().unwrap().data(), b"hi");

    let other = TreePath::parse("docs/faq").unwrap();
    let c2 = write_revision(&mut store, Some(&c1), revision(&other, Some(&b"?"[..]), 2)).unwrap();
    assert_eq!(c2.parents, vec![c1.id()]);
    assert_eq!(find(&store, &c2, &path).unwrap().id(), page.id());
    assert!(find(&store, &c2, &other).is_ok());
    assert_eq!(store.get_commit(&c2.id()).unwrap(), c2);
}

#[test]
fn test_delete_prunes_empty_trees() {
    use crate::object_store::in_memory::InMemoryObjectStore;
    use crate::resolve::{find, resolve, Resolution};

    let mut store = InMemoryObjectStore::new();
    let path = TreePath::parse("a/b/c").unwrap();
    let c1 = write_revision(&mut store, None, revision(&path, Some(&b"x"[..]), 1)).unwrap();
    let c2 = write_revision(&mut store, Some(&c1), revision(&path, None, 2)).unwrap();

    let root = find(&store, &c2, &TreePath::root()).unwrap();
    assert!(root.as_tree().unwrap().is_empty());
    assert!(matches!(
        resolve(&store, &c2, &TreePath::parse("a").unwrap()).unwrap(),
        Resolution::NotFound { at: 0, .. }
    ));

    assert!(matches!(
        write_revision(&mut store, Some(&c2), revision(&path, None, 3)),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn test_cannot_write_through_a_blob() {
    use crate::object_store::in_memory::InMemoryObjectStore;

    let mut store = InMemoryObjectStore::new();
    let page = TreePath::parse("page").unwrap();
    let c1 = write_revision(&mut store, None, revision(&page, Some(&b"x"[..]), 1)).unwrap();
    let below = TreePath::parse("page/child").unwrap();
    assert!(matches!(
        write_revision(&mut store, Some(&c1), revision(&below, Some(&b"y"[..]), 2)),
        Err(Error::InvalidTree { .. })
    ));
    assert!(matches!(
        write_revision(&mut store, Some(&c1), revision(&TreePath::root(), Some(&b"y"[..]), 2)),
        Err(Error::InvalidPath(_))
    ));
}
