//! Core types for the httpfs sandboxed file server.
//!
//! Defines the credential table, server configuration, the operation model
//! and the path resolver that confines every request to its tenant's
//! sandbox directory.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod credentials;
pub mod error;
pub mod operation;
pub mod resolve;

pub use config::Config;
pub use credentials::{ApiKey, CredentialTable, SandboxDir};
pub use error::{ConfigError, ResolveError};
pub use operation::OperationKind;
pub use resolve::{resolve, SandboxRoot};

/// Permission bits for files created by the server.
pub const FILE_MODE: u32 = 0o644;

/// Permission bits for directories created by the server.
pub const DIR_MODE: u32 = 0o755;
