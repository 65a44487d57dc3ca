//! Change points of a single path across a sequence of commits.

use crate::{
    object::{Commit, Stored},
    object_id::ObjectId,
    object_store::ObjectStore,
    resolve::{resolve, Resolution},
    tree_path::TreePath,
    Result,
};

/// A commit at which the content under a path changed. `resolved` is `None`
/// when the path did not resolve there (missing, or blocked by a non-tree).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub commit: Stored<Commit>,
    pub resolved: Option<Stored>,
}

/// Resolves `path` at each of `commits` (most recent first) and returns one
/// entry per run of commits with the same resolution. Each entry carries the
/// oldest commit of its run, the one where that content appeared.
///
/// Storage errors abort the walk; absence and invalidity do not.
pub fn history<S, I>(store: &S, commits: I, path: &TreePath) -> Result<Vec<HistoryEntry>>
where
    S: ObjectStore + ?Sized,
    I: IntoIterator<Item = Stored<Commit>>,
{
    // None: nothing recorded yet. Some(None): recorded as absent.
    let mut last: Option<Option<ObjectId>> = None;
    let mut entries: Vec<HistoryEntry> = Vec::new();
    for commit in commits {
        let resolved = match resolve(store, &commit, path)? {
            Resolution::Found(object) => Some(object),
            Resolution::NotFound { .. } | Resolution::Invalid { .. } => None,
        };
        let identity = resolved.as_ref().map(|object| object.id());
        if last == Some(identity) {
            if let Some(entry) = entries.last_mut() {
                entry.commit = commit;
            }
        } else {
            entries.push(HistoryEntry { commit, resolved });
            last = Some(identity);
        }
    }
    for entry in &entries {
        log::debug!("{} changes at {}", path, entry.commit.id());
    }
    Ok(entries)
}

#[cfg(test)]
mod scenario {
    use super::*;
    use crate::object::{Blob, EntryMode, GitObject, Tree};
    use crate::object_store::in_memory::InMemoryObjectStore;
    use crate::resolve::fixture::commit;

    pub fn with_page(store: &mut InMemoryObjectStore, content: Option<&str>) -> ObjectId {
        let mut root = Tree::new();
        root.insert(
            "other",
            EntryMode::Blob,
            store.insert(Blob::new(&b"unrelated"[..])).unwrap(),
        )
        .unwrap();
        if let Some(content) = content {
            let blob = store.insert(Blob::new(content.as_bytes())).unwrap();
            root.insert("p", EntryMode::Blob, blob).unwrap();
        }
        store.insert(root).unwrap()
    }

    pub fn chain(
        store: &mut InMemoryObjectStore,
        trees: &[ObjectId],
    ) -> Vec<Stored<Commit>> {
        let mut commits: Vec<Stored<Commit>> = Vec::new();
        for (i, tree) in trees.iter().enumerate() {
            let parents = commits.last().map(|c| vec![c.id()]).unwrap_or_default();
            let c = Stored::from_commit(commit(*tree, parents, i as i64 + 1));
            store.put(&GitObject::Commit(c.get().clone())).unwrap();
            commits.push(c);
        }
        commits
    }
}

#[test]
fn test_history_collapses_unchanged_commits() {
    use crate::object_store::in_memory::InMemoryObjectStore;

    let mut store = InMemoryObjectStore::new();
    let x = scenario::with_page(&mut store, Some("X"));
    let y = scenario::with_page(&mut store, Some("Y"));
    let gone = scenario::with_page(&mut store, None);
    // C1 creates p, C2 leaves it alone, C3 changes it, C4 deletes it
    let c = scenario::chain(&mut store, &[x, x, y, gone]);

    let newest_first = c.iter().rev().cloned();
    let path = TreePath::parse("p").unwrap();
    let entries = history(&store, newest_first, &path).unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].commit.id(), c[3].id());
    assert!(entries[0].resolved.is_none());
    assert_eq!(entries[1].commit.id(), c[2].id());
    assert_eq!(
        entries[1].resolved.as_ref().unwrap().as_blob().unwrap().data(),
        b"Y"
    );
    assert_eq!(entries[2].commit.id(), c[0].id());
    assert_eq!(
        entries[2].resolved.as_ref().unwrap().as_blob().unwrap().data(),
        b"X"
    );
}

#[test]
fn test_history_treats_invalid_as_absent() {
    use crate::object_store::in_memory::InMemoryObjectStore;

    let mut store = InMemoryObjectStore::new();
    let x = scenario::with_page(&mut store, Some("X"));
    let gone = scenario::with_page(&mut store, None);
    // p is a blob at C2 and C3, so "p/q" is invalid there and missing at C1
    let c = scenario::chain(&mut store, &[gone, x, x]);

    let path = TreePath::parse("p/q").unwrap();
    let entries = history(&store, c.iter().rev().cloned(), &path).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].commit.id(), c[0].id());
    assert!(entries[0].resolved.is_none());
}

#[test]
fn test_history_of_root_and_empty_sequence() {
    use crate::object_store::in_memory::InMemoryObjectStore;

    let mut store = InMemoryObjectStore::new();
    let x = scenario::with_page(&mut store, Some("X"));
    let y = scenario::with_page(&mut store, Some("Y"));
    let c = scenario::chain(&mut store, &[x, y, y]);

    let entries = history(&store, c.iter().rev().cloned(), &TreePath::root()).unwrap();
    let ids: Vec<_> = entries.iter().map(|e| e.commit.id()).collect();
    assert_eq!(ids, vec![c[1].id(), c[0].id()]);

    assert!(history(&store, Vec::new(), &TreePath::root())
        .unwrap()
        .is_empty());
}

#[test]
fn test_history_propagates_storage_errors() {
    use crate::object_store::in_memory::InMemoryObjectStore;
    use crate::resolve::fixture::commit;

    let store = InMemoryObjectStore::new();
    let dangling = Stored::from_commit(commit(ObjectId::from_bytes([3; 20]), vec![], 1));
    assert!(history(&store, vec![dangling], &TreePath::root()).is_err());
}

#[test]
fn test_history_across_a_merge() {
    use crate::ancestry::{Ancestry, DateOrder, FirstParent};
    use crate::object::GitObject;
    use crate::object_store::in_memory::InMemoryObjectStore;
    use crate::resolve::fixture::commit;

    let mut store = InMemoryObjectStore::new();
    let x = scenario::with_page(&mut store, Some("X"));
    let y = scenario::with_page(&mut store, Some("Y"));
    // root and left keep X, right changes p to Y, the merge takes right's tree
    let c = scenario::chain(&mut store, &[x, x]);
    let (root, left) = (&c[0], &c[1]);
    let right = Stored::from_commit(commit(y, vec![root.id()], 3));
    store.put(&GitObject::Commit(right.get().clone())).unwrap();
    let merge = Stored::from_commit(commit(y, vec![left.id(), right.id()], 4));
    store.put(&GitObject::Commit(merge.get().clone())).unwrap();

    let path = TreePath::parse("p").unwrap();
    let change_points = |commits: Vec<Stored<Commit>>| -> Vec<(ObjectId, ObjectId)> {
        history(&store, commits, &path)
            .unwrap()
            .iter()
            .map(|e| (e.commit.id(), e.resolved.as_ref().unwrap().id()))
            .collect()
    };
    let blob = |content: &[u8]| crate::object::hash(crate::object::ObjectType::Blob, content);

    let all = DateOrder.ancestors(&store, &merge).unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(
        change_points(all),
        vec![(right.id(), blob(&b"Y"[..])), (root.id(), blob(&b"X"[..]))]
    );

    let first = FirstParent.ancestors(&store, &merge).unwrap();
    assert_eq!(
        change_points(first),
        vec![(merge.id(), blob(&b"Y"[..])), (root.id(), blob(&b"X"[..]))]
    );
}
