use std::collections::BTreeMap;

use crate::{
    object::{self, GitObject, Stored},
    object_id::ObjectId,
    Error, Result,
};

use super::ObjectStore;

/// Keeps framed objects in a map. Nothing is compressed or persisted.
#[derive(Debug, Default, Clone)]
pub struct InMemoryObjectStore {
    objects: BTreeMap<ObjectId, Vec<u8>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn contains(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.objects.contains_key(id))
    }

    fn get(&self, id: &ObjectId) -> Result<Stored> {
        let framed = self.objects.get(id).ok_or(Error::ObjectNotFound(*id))?;
        let (object_type, payload) = object::unframe(*id, framed)?;
        let object =
            GitObject::deserialize(object_type, payload).map_err(|err| Error::Corrupt {
                id: *id,
                reason: err.to_string(),
            })?;
        Ok(Stored::with_id(*id, object))
    }

    fn put(&mut self, object: &GitObject) -> Result<bool> {
        let framed = object.frame();
        let id = ObjectId::digest(&framed);
        if self.objects.contains_key(&id) {
            return Ok(false);
        }
        self.objects.insert(id, framed);
        Ok(true)
    }
}

#[test]
fn test_in_memory_object_store() {
    use crate::object::Blob;

    let mut store = InMemoryObjectStore::new();
    let blob = GitObject::Blob(Blob::new(&b"hello, world"[..]));
    assert!(store.put(&blob).unwrap());
    assert!(!store.put(&blob).unwrap());
    assert_eq!(store.len(), 1);

    let id = blob.id();
    assert!(store.contains(&id).unwrap());
    let stored = store.get(&id).unwrap();
    assert_eq!(stored.id(), id);
    assert_eq!(*stored, blob);

    let missing = ObjectId::from_bytes([0; 20]);
    assert!(matches!(store.get(&missing), Err(Error::ObjectNotFound(m)) if m == missing));
}

#[test]
fn test_typed_getters() {
    use crate::object::{Blob, ObjectType};

    let mut store = InMemoryObjectStore::new();
    let id = store.insert(Blob::new(&b"not a tree"[..])).unwrap();
    assert!(matches!(
        store.get_tree(&id),
        Err(Error::UnexpectedType {
            expected: ObjectType::Tree,
            found: ObjectType::Blob,
            ..
        })
    ));
}
