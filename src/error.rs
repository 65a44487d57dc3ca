use derive_more::{Display, From};

use crate::object::ObjectType;
use crate::object_id::ObjectId;

/// Everything that can go wrong while reading, writing or resolving objects.
#[derive(Debug, Display, From)]
pub enum Error {
    #[from]
    #[display(fmt = "I/O error: {}", _0)]
    Io(std::io::Error),
    /// No loose object exists for this id.
    #[display(fmt = "object {} not found", _0)]
    ObjectNotFound(ObjectId),
    /// The stored object could not be decompressed or its header is malformed.
    #[display(fmt = "object {} is corrupt: {}", id, reason)]
    Corrupt { id: ObjectId, reason: String },
    /// An object header names a type the codec does not know.
    #[display(fmt = "unsupported object type: {:?}", _0)]
    UnsupportedType(String),
    /// The payload read back does not hash to the id it was fetched by.
    #[display(fmt = "hash mismatch: expected {}, computed {}", expected, actual)]
    HashMismatch { expected: ObjectId, actual: ObjectId },
    /// A named entry is missing from a tree on the path.
    #[display(fmt = "{} not found", path)]
    NotFound { path: String },
    /// Resolution needed to descend through something that is not a tree.
    #[display(fmt = "{} does not name a tree", path)]
    InvalidTree { path: String },
    #[display(fmt = "object {} is a {}, expected a {}", id, found, expected)]
    UnexpectedType {
        id: ObjectId,
        expected: ObjectType,
        found: ObjectType,
    },
    #[display(fmt = "invalid object id: {:?}", _0)]
    InvalidObjectId(String),
    #[display(fmt = "no such branch: {}", _0)]
    RefNotFound(String),
    #[display(fmt = "invalid path: {}", _0)]
    InvalidPath(String),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
