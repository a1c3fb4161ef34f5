//! Filesystem operations for the httpfs sandboxed file server.
//!
//! Performs the four file operations on already-resolved paths. Nothing here
//! is transactional: a write interrupted midway leaves a partially written
//! file behind.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod error;
pub mod local;

pub use backend::{drain, ByteSource, FileBackend, FileReader, Operation, Outcome, WriteMode};
pub use error::ExecutorError;
pub use local::LocalFsBackend;
