use crate::{
    object::{Commit, GitObject, Stored, Tree},
    object_id::ObjectId,
    Result,
};

pub mod in_memory;
pub mod loose;

/// A content addressed store of [`GitObject`]s.
///
/// Objects are never overwritten: putting an object whose id is already
/// present is a successful no-op that returns `false`.
pub trait ObjectStore {
    fn contains(&self, id: &ObjectId) -> Result<bool>;

    /// Loads the object stored under `id`, labelled with that same `id`.
    fn get(&self, id: &ObjectId) -> Result<Stored>;

    /// Stores `object` under the hash of its contents, returning whether it was newly written.
    fn put(&mut self, object: &GitObject) -> Result<bool>;

    fn get_commit(&self, id: &ObjectId) -> Result<Stored<Commit>> {
        self.get(id)?.into_commit()
    }

    fn get_tree(&self, id: &ObjectId) -> Result<Stored<Tree>> {
        self.get(id)?.into_tree()
    }

    /// Puts `object` and hands back its id.
    fn insert(&mut self, object: impl Into<GitObject>) -> Result<ObjectId>
    where
        Self: Sized,
    {
        let object = object.into();
        self.put(&object)?;
        Ok(object.id())
    }
}
