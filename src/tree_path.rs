use std::fmt::Display;

use crate::{object::tree::name_problem, Error, Result};

/// A sequence of tree entry names leading from a commit's root tree.
///
/// An empty segment is a directory marker: it is consumed without a lookup,
/// so `["dir", ""]` resolves exactly like `["dir"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    /// The root tree.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        for segment in segments.iter().filter(|s| !s.is_empty()) {
            if let Some(problem) = name_problem(segment) {
                return Err(Error::InvalidPath(format!("segment {:?} {}", segment, problem)));
            }
        }
        Ok(Self { segments })
    }

    /// Splits `a/b/c` on `/`. Empty pieces are dropped except a trailing one,
    /// which is kept as the directory marker: `a/b/` is `["a", "b", ""]`.
    pub fn parse(s: &str) -> Result<Self> {
        let mut segments: Vec<&str> = s.split('/').filter(|part| !part.is_empty()).collect();
        if s.ends_with('/') && !segments.is_empty() {
            segments.push("");
        }
        Self::new(segments)
    }

    /// Every segment, directory markers included.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segments that name tree entries.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn is_root(&self) -> bool {
        self.names().next().is_none()
    }

    /// This path with the directory marker dropped and `name` appended.
    pub fn join(&self, name: &str) -> Result<Self> {
        Self::new(self.names().chain(std::iter::once(name)))
    }

    /// The last named segment.
    pub fn file_name(&self) -> Option<&str> {
        self.names().last()
    }
}

impl Display for TreePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

#[test]
fn test_parse() {
    assert_eq!(TreePath::parse("").unwrap(), TreePath::root());
    assert_eq!(TreePath::parse("/").unwrap(), TreePath::root());
    assert_eq!(
        TreePath::parse("a//b").unwrap().segments(),
        &["a".to_string(), "b".to_string()]
    );
    let dir = TreePath::parse("docs/guide/").unwrap();
    assert_eq!(dir.segments().len(), 3);
    assert_eq!(dir.segments()[2], "");
    assert_eq!(dir.to_string(), "docs/guide/");
    assert_eq!(dir.file_name(), Some("guide"));
}

#[test]
fn test_join_and_validation() {
    let dir = TreePath::parse("docs/").unwrap();
    assert_eq!(dir.join("intro").unwrap().to_string(), "docs/intro");
    assert!(TreePath::new(["a/b"]).is_err());
    assert!(dir.join("x\0y").is_err());
    assert!(matches!(dir.join("a/b"), Err(Error::InvalidPath(_))));
    assert_eq!(TreePath::new(["a", ""]).unwrap().to_string(), "a/");
    assert!(TreePath::parse("/").unwrap().is_root());
}
