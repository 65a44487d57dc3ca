use std::fmt::Display;

use crate::object::{Malformed, ObjectType};
use crate::object_id::ObjectId;

/// `Name <email> <unix-seconds> <+hhmm>` as written in commit headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub time: i64,
    pub offset: String,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>, time: i64) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            time,
            offset: String::from("+0000"),
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let (name, rest) = s.split_once(" <")?;
        let (email, rest) = rest.split_once("> ")?;
        let (time, offset) = rest.split_once(' ')?;
        Some(Self {
            name: name.to_owned(),
            email: email.to_owned(),
            time: time.parse().ok()?,
            offset: offset.to_owned(),
        })
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}> {} {}", self.name, self.email, self.time, self.offset)
    }
}

/// One revision: a root tree, its parents and who made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    /// Headers after `committer` such as `encoding` or `gpgsig`, kept verbatim.
    pub extra_headers: Vec<(String, String)>,
    pub message: String,
}

impl Commit {
    pub fn id(&self) -> ObjectId {
        crate::object::hash(ObjectType::Commit, &self.serialize())
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = format!("tree {}\n", self.tree);
        for parent in &self.parents {
            out.push_str(&format!("parent {}\n", parent));
        }
        out.push_str(&format!("author {}\n", self.author));
        out.push_str(&format!("committer {}\n", self.committer));
        for (key, value) in &self.extra_headers {
            // continuation lines start with a single space
            out.push_str(&format!("{} {}\n", key, value.replace('\n', "\n ")));
        }
        out.push('\n');
        out.push_str(&self.message);
        out.into_bytes()
    }

    pub fn deserialize(payload: &[u8]) -> Result<Self, Malformed> {
        let text =
            std::str::from_utf8(payload).map_err(|_| Malformed::new("commit is not UTF-8"))?;
        let (headers, message) = text
            .split_once("\n\n")
            .ok_or_else(|| Malformed::new("commit has no message separator"))?;

        let mut lines = headers.split('\n').peekable();
        let tree = lines
            .next()
            .and_then(|l| l.strip_prefix("tree "))
            .and_then(|hex| hex.parse().ok())
            .ok_or_else(|| Malformed::new("commit does not start with a tree"))?;

        let mut parents = Vec::new();
        while let Some(line) = lines.next_if(|l| l.starts_with("parent ")) {
            let hex = &line["parent ".len()..];
            parents.push(
                hex.parse()
                    .map_err(|_| Malformed::new(format!("bad parent id {:?}", hex)))?,
            );
        }

        let mut signature = |key: &str| {
            lines
                .next()
                .and_then(|l| l.strip_prefix(key))
                .and_then(|l| l.strip_prefix(' '))
                .and_then(Signature::parse)
                .ok_or_else(|| Malformed::new(format!("commit has no valid {} line", key)))
        };
        let author = signature("author")?;
        let committer = signature("committer")?;

        let mut extra_headers: Vec<(String, String)> = Vec::new();
        for line in lines {
            if let Some(continuation) = line.strip_prefix(' ') {
                let (_, value) = extra_headers
                    .last_mut()
                    .ok_or_else(|| Malformed::new("continuation line without a header"))?;
                value.push('\n');
                value.push_str(continuation);
            } else {
                let (key, value) = line
                    .split_once(' ')
                    .ok_or_else(|| Malformed::new(format!("bad commit header {:?}", line)))?;
                extra_headers.push((key.to_owned(), value.to_owned()));
            }
        }

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            extra_headers,
            message: message.to_owned(),
        })
    }
}

#[cfg(test)]
fn sample(parents: Vec<ObjectId>) -> Commit {
    let who = Signature::new("A U Thor", "author@example.com", 1112911993);
    Commit {
        tree: "4b825dc642cb6eb9a060e54bf8d69288fbee4904".parse().unwrap(),
        parents,
        author: who.clone(),
        committer: who,
        extra_headers: Vec::new(),
        message: String::from("initial\n"),
    }
}

#[test]
fn test_commit_matches_git() {
    let commit = sample(Vec::new());
    let text = String::from_utf8(commit.serialize()).unwrap();
    assert_eq!(
        text,
        "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
         author A U Thor <author@example.com> 1112911993 +0000\n\
         committer A U Thor <author@example.com> 1112911993 +0000\n\
         \n\
         initial\n"
    );
}

#[test]
fn test_commit_round_trip() {
    let mut merge = sample(vec![
        ObjectId::from_bytes([1; 20]),
        ObjectId::from_bytes([2; 20]),
    ]);
    merge.committer.offset = String::from("-0700");
    merge.extra_headers = vec![
        (String::from("encoding"), String::from("ISO-8859-1")),
        (
            String::from("gpgsig"),
            String::from("-----BEGIN PGP SIGNATURE-----\n\nabc\n-----END PGP SIGNATURE-----"),
        ),
    ];
    merge.message = String::from("merge\n\nwith a body\n");
    let bytes = merge.serialize();
    assert_eq!(Commit::deserialize(&bytes).unwrap(), merge);
    assert_eq!(merge.id(), Commit::deserialize(&bytes).unwrap().id());
}

#[test]
fn test_commit_rejects_malformed() {
    assert!(Commit::deserialize(b"tree nope\n\nmsg").is_err());
    assert!(Commit::deserialize(b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\nmsg").is_err());
    assert!(Commit::deserialize(
        b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\nauthor nobody\n\nmsg"
    )
    .is_err());
}
