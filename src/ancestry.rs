use std::collections::{BTreeSet, VecDeque};

use crate::{
    object::{Commit, Stored},
    object_store::ObjectStore,
    Result,
};

/// Produces the commits a history walk visits, most recent first,
/// starting with `head` itself.
pub trait Ancestry {
    fn ancestors<S>(&self, store: &S, head: &Stored<Commit>) -> Result<Vec<Stored<Commit>>>
    where
        S: ObjectStore + ?Sized;
}

/// Follows the first parent of every commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstParent;

impl Ancestry for FirstParent {
    fn ancestors<S>(&self, store: &S, head: &Stored<Commit>) -> Result<Vec<Stored<Commit>>>
    where
        S: ObjectStore + ?Sized,
    {
        let mut seen = BTreeSet::new();
        let mut commits = Vec::new();
        let mut next = Some(head.clone());
        while let Some(commit) = next.take() {
            if !seen.insert(commit.id()) {
                log::warn!("commit {} reached twice, parent links form a cycle", commit.id());
                break;
            }
            if let Some(parent) = commit.parents.first() {
                next = Some(store.get_commit(parent)?);
            }
            commits.push(commit);
        }
        Ok(commits)
    }
}

/// Every reachable commit, newest committer time first. Commits with equal
/// times keep the breadth-first order in which they were discovered.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateOrder;

impl Ancestry for DateOrder {
    fn ancestors<S>(&self, store: &S, head: &Stored<Commit>) -> Result<Vec<Stored<Commit>>>
    where
        S: ObjectStore + ?Sized,
    {
        let mut seen = BTreeSet::from([head.id()]);
        let mut queue = VecDeque::from([head.clone()]);
        let mut commits = Vec::new();
        while let Some(commit) = queue.pop_front() {
            for parent in &commit.parents {
                if seen.insert(*parent) {
                    queue.push_back(store.get_commit(parent)?);
                }
            }
            commits.push(commit);
        }
        commits.sort_by(|a, b| b.committer.time.cmp(&a.committer.time));
        log::debug!("{} commits reachable from {}", commits.len(), head.id());
        Ok(commits)
    }
}

#[cfg(test)]
fn graph() -> (
    crate::object_store::in_memory::InMemoryObjectStore,
    Vec<Stored<Commit>>,
) {
    use crate::object::{GitObject, Tree};
    use crate::resolve::fixture::commit;

    //   root(1) <- left(2) <- merge(4)
    //          \- right(3) -/
    let mut store = crate::object_store::in_memory::InMemoryObjectStore::new();
    let tree = store.insert(Tree::new()).unwrap();
    let mut add = |c: Commit| {
        let stored = Stored::from_commit(c);
        store.put(&GitObject::Commit(stored.get().clone())).unwrap();
        stored
    };
    let root = add(commit(tree, vec![], 1));
    let left = add(commit(tree, vec![root.id()], 2));
    let right = add(commit(tree, vec![root.id()], 3));
    let merge = add(commit(tree, vec![left.id(), right.id()], 4));
    (store, vec![root, left, right, merge])
}

#[test]
fn test_first_parent() {
    let (store, c) = graph();
    let ids: Vec<_> = FirstParent
        .ancestors(&store, &c[3])
        .unwrap()
        .iter()
        .map(|s| s.id())
        .collect();
    assert_eq!(ids, vec![c[3].id(), c[1].id(), c[0].id()]);
}

#[test]
fn test_date_order_visits_every_parent_once() {
    let (store, c) = graph();
    let ids: Vec<_> = DateOrder
        .ancestors(&store, &c[3])
        .unwrap()
        .iter()
        .map(|s| s.id())
        .collect();
    assert_eq!(ids, vec![c[3].id(), c[2].id(), c[1].id(), c[0].id()]);
}

#[test]
fn test_missing_parent_propagates() {
    use crate::resolve::fixture::commit;
    use crate::Error;

    let store = crate::object_store::in_memory::InMemoryObjectStore::new();
    let dangling = crate::object_id::ObjectId::from_bytes([9; 20]);
    let head = Stored::from_commit(commit(dangling, vec![dangling], 1));
    assert!(matches!(
        FirstParent.ancestors(&store, &head),
        Err(Error::ObjectNotFound(id)) if id == dangling
    ));
}
