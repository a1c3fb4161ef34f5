//! Error types for the executor crate.

use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur while operating on a file.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutorError {
    /// The target of a read or delete does not exist, or is a directory.
    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// Any other operating-system failure.
    #[error("error {op} '{}': {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExecutorError {
    /// Wrap an I/O error, keeping the path and the step that failed.
    pub(crate) fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_owned(),
            source,
        }
    }

    /// Like [`ExecutorError::io`], but maps `NotFound` to [`ExecutorError::NotFound`].
    pub(crate) fn lookup(op: &'static str, path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_owned(),
            }
        } else {
            Self::io(op, path, source)
        }
    }

    /// Returns `true` for [`ExecutorError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
