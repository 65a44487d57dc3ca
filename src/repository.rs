use std::{
    fs::{create_dir_all, read_to_string},
    io::{ErrorKind, Write},
    path::{Component, Path, PathBuf},
};

use serde::Deserialize;
use tempfile::NamedTempFile;

use crate::{
    object::{Commit, Signature, Stored},
    object_id::ObjectId,
    object_store::{loose::LooseObjectStore, ObjectStore},
    page::Page,
    publish::{write_revision, Revision},
    tree_path::TreePath,
    Error, Result,
};

/// Tunables for a [`Repository`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Re-hash every object read and reject it if it does not match its id.
    pub verify_reads: bool,
    /// zlib level (0-9) for objects written from now on.
    pub compression: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            verify_reads: true,
            compression: 6,
        }
    }
}

/// A directory holding `objects/` and `refs/heads/`.
pub struct Repository {
    dir: PathBuf,
    objects: LooseObjectStore,
}

impl Repository {
    /// Creates the directory layout if it is missing and opens it.
    pub fn init(dir: PathBuf, options: &Options) -> Result<Self> {
        create_dir_all(dir.join("objects"))?;
        create_dir_all(dir.join("refs").join("heads"))?;
        log::info!("initialized repository in {:?}", dir);
        Self::open(dir, options)
    }

    pub fn open(dir: PathBuf, options: &Options) -> Result<Self> {
        if !dir.join("objects").is_dir() {
            return Err(Error::Io(std::io::Error::new(
                ErrorKind::NotFound,
                format!("{:?} has no objects directory", dir),
            )));
        }
        let objects = LooseObjectStore::new(dir.join("objects"))?
            .with_verification(options.verify_reads)
            .with_compression(options.compression);
        Ok(Self { dir, objects })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn objects(&self) -> &LooseObjectStore {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut LooseObjectStore {
        &mut self.objects
    }

    pub fn get_object(&self, id: &ObjectId) -> Result<Stored> {
        self.objects.get(id)
    }

    /// `refs/heads/<branch>`. Every component of `branch` must be a plain
    /// name, so the result stays below `refs/heads`.
    fn ref_path(&self, branch: &str) -> Result<PathBuf> {
        let plain = Path::new(branch)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !plain
            || branch.is_empty()
            || branch.starts_with('.')
            || branch.contains("..")
            || branch.contains('\\')
            || branch.contains("//")
            || branch.ends_with('/')
        {
            return Err(Error::RefNotFound(branch.to_owned()));
        }
        Ok(self.dir.join("refs").join("heads").join(branch))
    }

    /// The commit id `refs/heads/<branch>` points at.
    pub fn head(&self, branch: &str) -> Result<ObjectId> {
        match read_to_string(self.ref_path(branch)?) {
            Ok(s) => s.trim().parse(),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(Error::RefNotFound(branch.to_owned()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn head_commit(&self, branch: &str) -> Result<Stored<Commit>> {
        self.objects.get_commit(&self.head(branch)?)
    }

    /// Points `branch` at `id`. The ref file is replaced by a rename, so
    /// readers see either the old or the new id.
    pub fn publish_head(&self, branch: &str, id: ObjectId) -> Result<()> {
        let path = self.ref_path(branch)?;
        let dir = path
            .parent()
            .ok_or_else(|| Error::RefNotFound(branch.to_owned()))?;
        create_dir_all(dir)?;
        let mut file = NamedTempFile::new_in(dir)?;
        writeln!(file, "{}", id)?;
        file.persist(&path).map_err(|err| err.error)?;
        log::info!("{} -> {}", branch, id);
        Ok(())
    }

    /// Opens `path` at the head of `branch`.
    pub fn page(&self, branch: &str, path: TreePath) -> Result<Page> {
        Page::open(&self.objects, self.head_commit(branch)?, path)
    }

    /// Writes (or with `content: None`, deletes) one page on `branch` and
    /// publishes the new commit. A branch that does not exist yet starts
    /// with a root commit.
    pub fn commit_page(
        &mut self,
        branch: &str,
        path: &TreePath,
        content: Option<&[u8]>,
        author: Signature,
        message: &str,
    ) -> Result<Stored<Commit>> {
        let parent = match self.head_commit(branch) {
            Ok(commit) => Some(commit),
            Err(Error::RefNotFound(_)) => None,
            Err(err) => return Err(err),
        };
        let revision = Revision {
            path,
            content,
            committer: author.clone(),
            author,
            message: message.to_owned(),
        };
        let commit = write_revision(&mut self.objects, parent.as_ref(), revision)?;
        self.publish_head(branch, commit.id())?;
        Ok(commit)
    }
}

#[cfg(test)]
fn editor(time: i64) -> Signature {
    Signature::new("Editor", "editor@example.com", time)
}

#[test]
fn test_refs() {
    let tempdir = tempfile::tempdir().unwrap();
    let repo = Repository::init(tempdir.path().join("wiki"), &Options::default()).unwrap();
    assert!(matches!(repo.head("main"), Err(Error::RefNotFound(b)) if b == "main"));
    assert!(repo.head("../escape").is_err());

    let id = ObjectId::from_bytes([0x5a; 20]);
    repo.publish_head("main", id).unwrap();
    assert_eq!(repo.head("main").unwrap(), id);
    let written = std::fs::read_to_string(repo.dir().join("refs/heads/main")).unwrap();
    assert_eq!(written, format!("{}\n", id));

    let reopened = Repository::open(repo.dir().to_path_buf(), &Options::default()).unwrap();
    assert_eq!(reopened.head("main").unwrap(), id);
}

#[test]
fn test_branch_names_stay_inside_the_repository() {
    let tempdir = tempfile::tempdir().unwrap();
    let repo = Repository::init(tempdir.path().join("wiki"), &Options::default()).unwrap();
    let id = ObjectId::from_bytes([0x11; 20]);

    let outside = tempdir.path().join("outside");
    let absolute = outside.to_str().unwrap();
    assert!(matches!(
        repo.publish_head(absolute, id),
        Err(Error::RefNotFound(b)) if b == absolute
    ));
    assert!(!outside.exists());
    assert!(repo.head(absolute).is_err());

    for bad in ["", "./main", "a/../b", "a//b", "a/", "a\\b"] {
        assert!(repo.publish_head(bad, id).is_err(), "{:?}", bad);
    }

    repo.publish_head("feature/x", id).unwrap();
    assert_eq!(repo.head("feature/x").unwrap(), id);
    assert!(repo.dir().join("refs/heads/feature/x").is_file());
}

#[test]
fn test_open_requires_objects_dir() {
    let tempdir = tempfile::tempdir().unwrap();
    assert!(Repository::open(tempdir.path().to_path_buf(), &Options::default()).is_err());
}

#[test]
fn test_page_history_through_repository() {
    use crate::ancestry::FirstParent;

    let tempdir = tempfile::tempdir().unwrap();
    let mut repo = Repository::init(tempdir.path().to_path_buf(), &Options::default()).unwrap();
    let home = TreePath::parse("Home").unwrap();
    let notes = TreePath::parse("notes/today").unwrap();

    let c1 = repo
        .commit_page("main", &home, Some(b"X".as_slice()), editor(1), "create")
        .unwrap();
    repo.commit_page("main", &notes, Some(b"n".as_slice()), editor(2), "notes")
        .unwrap();
    let c3 = repo
        .commit_page("main", &home, Some(b"Y".as_slice()), editor(3), "edit")
        .unwrap();
    let c4 = repo
        .commit_page("main", &home, None, editor(4), "delete")
        .unwrap();
    assert_eq!(repo.head("main").unwrap(), c4.id());

    let page = repo.page("main", home).unwrap();
    assert!(!page.exists());
    let history = page.history(repo.objects(), &FirstParent).unwrap();
    let points: Vec<(ObjectId, Option<Vec<u8>>)> = history
        .iter()
        .map(|entry| {
            let data = entry
                .resolved
                .as_ref()
                .and_then(|o| o.as_blob())
                .map(|b| b.data().to_vec());
            (entry.commit.id(), data)
        })
        .collect();
    assert_eq!(
        points,
        vec![
            (c4.id(), None),
            (c3.id(), Some(b"Y".to_vec())),
            (c1.id(), Some(b"X".to_vec())),
        ]
    );

    let notes_dir = repo.page("main", TreePath::parse("notes/").unwrap()).unwrap();
    assert_eq!(notes_dir.name(), "notes/");
    assert_eq!(notes_dir.entries(repo.objects()).unwrap()[0].name(), "notes/today");
}

#[test]
fn test_options_from_json() {
    let options: Options = serde_json::from_str(r#"{ "verify_reads": false }"#).unwrap();
    assert_eq!(
        options,
        Options {
            verify_reads: false,
            compression: 6
        }
    );
    assert!(serde_json::from_str::<Options>(r#"{ "verify": true }"#).is_err());
}
