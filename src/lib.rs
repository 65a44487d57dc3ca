//! # Page Store
//!
//! Versioned, hierarchical pages kept in git compatible loose objects.
//! A page is whatever a path resolves to inside a commit's tree, and its
//! history is the list of commits at which that resolution changed.

mod hex;

pub mod ancestry;
mod error;
pub mod history;
/// Blobs, trees and commits with their canonical encoding.
pub mod object;
/// Hash-based object identifier.
pub mod object_id;
/// Content addressable store API using the [`ObjectId`](object_id::ObjectId).
pub mod object_store;
pub mod page;
pub mod publish;
pub mod repository;
pub mod resolve;
pub mod tree_path;

pub use error::{Error, Result};
