//! HTTP surface for the httpfs sandboxed file server.
//!
//! Authenticates each request against the credential table, resolves its URL
//! path inside the caller's sandbox, maps the method onto a file operation,
//! and hosts the dispatcher behind a plaintext or TLS listener with graceful
//! shutdown.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod auth;
pub mod dispatch;
pub mod error;
pub mod server;
pub mod write_timeout;

pub use dispatch::{create_router, Dispatcher};
pub use error::{DispatchError, ServerError};
pub use server::{shutdown_signal, FileServer, ServerHandle, ServerState, Timeouts};
