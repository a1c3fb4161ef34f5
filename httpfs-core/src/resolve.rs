//! Maps request URL paths onto files inside a tenant's sandbox.
//!
//! Resolution is purely lexical: nothing touches the filesystem. The URL path
//! is percent-decoded, split on `/`, and folded segment by segment. A `..`
//! that would climb above the sandbox is rejected rather than clamped, and
//! the joined result is checked against the sandbox prefix once more before
//! it is handed out.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::credentials::SandboxDir;
use crate::error::ResolveError;

/// The directory a single tenant is confined to: `file_root/sandbox_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRoot {
    base: PathBuf,
}

impl SandboxRoot {
    /// Combine the configured file root with a tenant's sandbox directory.
    #[must_use]
    pub fn new(file_root: &Path, sandbox: &SandboxDir) -> Self {
        Self {
            base: file_root.join(sandbox.as_path()),
        }
    }

    /// The sandbox directory itself.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolve a raw URL path to a file strictly inside the sandbox.
    ///
    /// # Errors
    /// - [`ResolveError::Encoding`] if the decoded path is not UTF-8.
    /// - [`ResolveError::Escapes`] if a `..` segment climbs above the sandbox.
    /// - [`ResolveError::NoFile`] if the path names the sandbox itself (`/`).
    pub fn resolve(&self, url_path: &str) -> Result<PathBuf, ResolveError> {
        let decoded = percent_decode_str(url_path)
            .decode_utf8()
            .map_err(|_| ResolveError::Encoding(url_path.to_owned()))?;

        let mut segments: Vec<&str> = Vec::new();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(ResolveError::Escapes(url_path.to_owned()));
                    }
                }
                name => segments.push(name),
            }
        }
        if segments.is_empty() {
            return Err(ResolveError::NoFile(url_path.to_owned()));
        }

        let resolved: PathBuf = segments
            .iter()
            .fold(self.base.clone(), |path, segment| path.join(segment));

        // A segment that parses as an absolute path or drive prefix replaces
        // the base on join, so containment is checked on the final value too.
        if resolved == self.base || !resolved.starts_with(&self.base) {
            return Err(ResolveError::Escapes(url_path.to_owned()));
        }
        Ok(resolved)
    }
}

/// Resolve `url_path` under `file_root/sandbox`.
///
/// Shorthand for [`SandboxRoot::new`] followed by [`SandboxRoot::resolve`].
///
/// # Errors
/// See [`SandboxRoot::resolve`].
pub fn resolve(file_root: &Path, sandbox: &SandboxDir, url_path: &str) -> Result<PathBuf, ResolveError> {
    SandboxRoot::new(file_root, sandbox).resolve(url_path)
}
