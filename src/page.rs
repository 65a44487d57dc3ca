use crate::{
    ancestry::Ancestry,
    history::{history, HistoryEntry},
    object::{Commit, GitObject, Stored},
    object_store::ObjectStore,
    resolve::{resolve, Resolution},
    tree_path::TreePath,
    Error, Result,
};

/// A path as seen from one commit, with whatever it resolved to.
#[derive(Debug, Clone)]
pub struct Page {
    path: TreePath,
    commit: Stored<Commit>,
    object: Option<Stored>,
}

impl Page {
    /// Resolves `path` at `commit`. A missing entry yields a page without an
    /// object; a path running through a non-tree is an [`Error::InvalidTree`].
    pub fn open<S>(store: &S, commit: Stored<Commit>, path: TreePath) -> Result<Self>
    where
        S: ObjectStore + ?Sized,
    {
        let object = match resolve(store, &commit, &path)? {
            Resolution::Found(object) => Some(object),
            Resolution::NotFound { .. } => None,
            Resolution::Invalid { .. } => {
                return Err(Error::InvalidTree {
                    path: path.to_string(),
                })
            }
        };
        Ok(Self {
            path,
            commit,
            object,
        })
    }

    pub fn path(&self) -> &TreePath {
        &self.path
    }

    pub fn commit(&self) -> &Stored<Commit> {
        &self.commit
    }

    pub fn object(&self) -> Option<&Stored> {
        self.object.as_ref()
    }

    pub fn exists(&self) -> bool {
        self.object.is_some()
    }

    pub fn is_tree(&self) -> bool {
        matches!(self.object.as_deref(), Some(GitObject::Tree(_)))
    }

    /// Named segments joined by `/`, with a trailing `/` for trees.
    pub fn name(&self) -> String {
        let mut name = self.path.names().collect::<Vec<_>>().join("/");
        if self.is_tree() {
            name.push('/');
        }
        name
    }

    /// The content of a blob page.
    pub fn data(&self) -> Option<&[u8]> {
        self.object.as_ref()?.as_blob().map(|blob| blob.data())
    }

    /// The child pages of a tree page, in entry order. Empty for anything else.
    pub fn entries<S>(&self, store: &S) -> Result<Vec<Page>>
    where
        S: ObjectStore + ?Sized,
    {
        let tree = match self.object.as_ref().and_then(|o| o.as_tree()) {
            Some(tree) => tree,
            None => return Ok(Vec::new()),
        };
        tree.entries()
            .map(|entry| -> Result<Page> {
                Ok(Page {
                    path: self.path.join(&entry.name)?,
                    commit: self.commit.clone(),
                    object: Some(store.get(&entry.id)?),
                })
            })
            .collect()
    }

    /// Change points of this page's path over the commits `ancestry` yields.
    pub fn history<S, A>(&self, store: &S, ancestry: &A) -> Result<Vec<HistoryEntry>>
    where
        S: ObjectStore + ?Sized,
        A: Ancestry,
    {
        let commits = ancestry.ancestors(store, &self.commit)?;
        history(store, commits, &self.path)
    }
}

#[cfg(test)]
fn open(path: &str) -> Result<Page> {
    let (store, commit) = crate::resolve::fixture::store_with_commit();
    Page::open(&store, Stored::from_commit(commit), TreePath::parse(path)?)
}

#[test]
fn test_open_pages() {
    let a = open("a").unwrap();
    assert!(a.exists());
    assert_eq!(a.name(), "a");
    assert_eq!(a.data(), Some(&b"alpha"[..]));

    let dir = open("dir/").unwrap();
    assert!(dir.is_tree());
    assert_eq!(dir.name(), "dir/");
    assert_eq!(dir.data(), None);

    let missing = open("nope").unwrap();
    assert!(!missing.exists());
    assert_eq!(missing.name(), "nope");

    assert!(matches!(open("a/x"), Err(Error::InvalidTree { .. })));
}

#[test]
fn test_entries() {
    let (store, commit) = crate::resolve::fixture::store_with_commit();
    let root = Page::open(&store, Stored::from_commit(commit), TreePath::root()).unwrap();
    assert_eq!(root.name(), "/");
    let names: Vec<String> = root
        .entries(&store)
        .unwrap()
        .iter()
        .map(Page::name)
        .collect();
    assert_eq!(names, vec!["a".to_string(), "dir/".to_string()]);

    let entries = root.entries(&store).unwrap();
    let children = entries[1].entries(&store).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name(), "dir/b");
    assert_eq!(children[0].data(), Some(&b"beta"[..]));
}
