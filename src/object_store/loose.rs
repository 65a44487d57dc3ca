use std::{
    fs::{create_dir_all, remove_file, File},
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use crate::{
    object::{self, GitObject, Stored},
    object_id::ObjectId,
    Error, Result,
};

use super::ObjectStore;

/// A persistent [`ObjectStore`] stored in an `objects` directory,
/// using the first two hexadecimal characters of the [`ObjectId`]
/// to determine which directory to place the object in
/// and creating a file with the rest of the hexadecimal characters
/// as the file name. Each file holds the zlib compressed framed object.
#[derive(Debug, Clone)]
pub struct LooseObjectStore {
    root: PathBuf,
    verify_reads: bool,
    compression: Compression,
}

impl LooseObjectStore {
    /// Opens the store rooted at `root`, creating the directory if needed.
    pub fn new(root: PathBuf) -> Result<Self> {
        if !root.try_exists()? {
            log::info!("creating object store root: {:?}", root);
            create_dir_all(&root)?;
        }
        Ok(Self {
            root,
            verify_reads: true,
            compression: Compression::default(),
        })
    }

    /// When enabled, [`get`](ObjectStore::get) re-hashes what it reads and
    /// fails with [`Error::HashMismatch`] if it disagrees with the requested id.
    pub fn with_verification(mut self, verify_reads: bool) -> Self {
        self.verify_reads = verify_reads;
        self
    }

    /// zlib level for newly written objects, clamped to `0..=9`.
    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression = Compression::new(level.min(9));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<hex[0:2]>/<hex[2:]>`
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (subdir, filename) = id.shard();
        self.root.join(subdir).join(filename)
    }

    fn read_framed(&self, id: &ObjectId) -> Result<Vec<u8>> {
        let path = self.object_path(id);
        let file = match File::options().read(true).open(&path) {
            Ok(f) => f,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(Error::ObjectNotFound(*id))
            }
            Err(err) => return Err(err.into()),
        };
        let mut framed = Vec::new();
        ZlibDecoder::new(file)
            .read_to_end(&mut framed)
            .map_err(|err| Error::Corrupt {
                id: *id,
                reason: format!("cannot decompress: {}", err),
            })?;
        Ok(framed)
    }
}

impl ObjectStore for LooseObjectStore {
    fn contains(&self, id: &ObjectId) -> Result<bool> {
        log::debug!("checking whether {} is contained in {:?}", id, self.root);
        Ok(self.object_path(id).try_exists()?)
    }

    fn get(&self, id: &ObjectId) -> Result<Stored> {
        log::debug!("reading {} from {:?}", id, self.root);
        let framed = self.read_framed(id)?;
        if self.verify_reads {
            let actual = ObjectId::digest(&framed);
            if actual != *id {
                return Err(Error::HashMismatch {
                    expected: *id,
                    actual,
                });
            }
        }
        let (object_type, payload) = object::unframe(*id, &framed)?;
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
        let path = self.object_path(&id);
        // A zlib stream is never empty, so an empty file is a write that never finished.
        match path.metadata() {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {
                log::debug!("{} already exists", id);
                return Ok(false);
            }
            Ok(_) => log::debug!("{} has no complete file, rewriting it", id),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        if let Some(subdir) = path.parent() {
            create_dir_all(subdir)?;
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), self.compression);
        encoder.write_all(&framed)?;
        let compressed = encoder.finish()?;

        if let Err(err) = write_locked(&path, &compressed) {
            log::warn!("failed to write {} to {:?}: {}", id, path, err);
            if let Err(cleanup) = remove_file(&path) {
                log::warn!("could not remove {:?}: {}", path, cleanup);
            }
            return Err(err.into());
        }

        log::info!("wrote {} {} to {:?}", object.object_type(), id, path);
        Ok(true)
    }
}

/// Concurrent writers of the same id serialize on the lock and write identical bytes.
fn write_locked(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::options().create(true).write(true).open(path)?;
    file.lock()?;
    file.set_len(0)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.unlock()
}

#[cfg(test)]
fn blob(content: &str) -> GitObject {
    GitObject::Blob(crate::object::Blob::new(content.as_bytes()))
}

#[test]
fn test_loose_object_store() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = LooseObjectStore::new(tempdir.path().join("objects")).unwrap();
    let hello = blob("hello\n");
    assert!(store.put(&hello).unwrap());

    let id: ObjectId = "ce013625030ba8dba906f756967f9e9ca394464a".parse().unwrap();
    let path = tempdir
        .path()
        .join("objects/ce/013625030ba8dba906f756967f9e9ca394464a");
    assert_eq!(store.object_path(&id), path);
    assert!(path.is_file());
    assert!(store.contains(&id).unwrap());

    let stored = store.get(&id).unwrap();
    assert_eq!(stored.id(), id);
    assert_eq!(stored.as_blob().unwrap().data(), b"hello\n");
}

#[test]
fn test_put_is_idempotent() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = LooseObjectStore::new(tempdir.path().to_path_buf()).unwrap();
    let page = blob("some page");
    assert!(store.put(&page).unwrap());
    let path = store.object_path(&page.id());
    let first = std::fs::read(&path).unwrap();

    // a different level would produce different bytes if the file were rewritten
    let mut store = store.with_compression(0);
    assert!(!store.put(&page).unwrap());
    assert_eq!(std::fs::read(&path).unwrap(), first);
}

#[test]
fn test_missing_and_corrupt_objects() {
    let tempdir = tempfile::tempdir().unwrap();
    let store = LooseObjectStore::new(tempdir.path().to_path_buf()).unwrap();
    let id = blob("never written").id();
    assert!(matches!(store.get(&id), Err(Error::ObjectNotFound(m)) if m == id));

    let path = store.object_path(&id);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"definitely not zlib").unwrap();
    assert!(matches!(store.get(&id), Err(Error::Corrupt { .. })));

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"blob 3 abc").unwrap();
    std::fs::write(&path, encoder.finish().unwrap()).unwrap();
    let store = store.with_verification(false);
    assert!(matches!(store.get(&id), Err(Error::Corrupt { .. })));
}

#[test]
fn test_verification_is_configurable() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = LooseObjectStore::new(tempdir.path().to_path_buf()).unwrap();
    let real = blob("real content");
    store.put(&real).unwrap();

    // plant the real object's file under an unrelated id
    let fake = blob("something else").id();
    let fake_path = store.object_path(&fake);
    std::fs::create_dir_all(fake_path.parent().unwrap()).unwrap();
    std::fs::copy(store.object_path(&real.id()), &fake_path).unwrap();

    assert!(matches!(
        store.get(&fake),
        Err(Error::HashMismatch { expected, actual }) if expected == fake && actual == real.id()
    ));

    let trusting = store.with_verification(false);
    let stored = trusting.get(&fake).unwrap();
    assert_eq!(stored.id(), fake);
    assert_eq!(*stored, real);
}

#[test]
fn test_put_replaces_an_unfinished_write() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = LooseObjectStore::new(tempdir.path().to_path_buf()).unwrap();
    let page = blob("interrupted");
    let path = store.object_path(&page.id());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"").unwrap();
    assert!(store.get(&page.id()).is_err());

    assert!(store.put(&page).unwrap());
    assert_eq!(*store.get(&page.id()).unwrap(), page);
    assert!(!store.put(&page).unwrap());
}

#[test]
fn test_failed_put_reports_the_error() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = LooseObjectStore::new(tempdir.path().to_path_buf()).unwrap();
    let page = blob("blocked");
    // a directory where the object file should go cannot be opened for writing
    let path = store.object_path(&page.id());
    std::fs::create_dir_all(path.join("occupied")).unwrap();
    assert!(matches!(store.put(&page), Err(Error::Io(_))));
    assert!(path.is_dir());
}
