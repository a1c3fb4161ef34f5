//! File backend abstraction and the tagged operation it executes.
//!
//! The dispatcher turns each request into an [`Operation`] carrying whatever
//! that operation needs, and hands it to a [`FileBackend`] together with the
//! resolved path.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use httpfs_core::OperationKind;
use tokio::io::AsyncRead;

use crate::ExecutorError;

/// Byte stream a write consumes, usually the request body.
pub type ByteSource<'a> = &'a mut (dyn AsyncRead + Unpin + Send);

/// Open file handed back by a read. Dropping it closes the file.
pub type FileReader = Box<dyn AsyncRead + Unpin + Send>;

/// Positioning for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Keep existing content and write at the end.
    Append,
    /// Discard existing content first.
    Truncate,
}

/// One file operation, tagged with the data it needs.
pub enum Operation<'a> {
    Read,
    AppendWrite(ByteSource<'a>),
    TruncateWrite(ByteSource<'a>),
    Delete,
}

impl Operation<'_> {
    /// The kind of this operation.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Read => OperationKind::Read,
            Self::AppendWrite(_) => OperationKind::AppendWrite,
            Self::TruncateWrite(_) => OperationKind::TruncateWrite,
            Self::Delete => OperationKind::Delete,
        }
    }
}

impl fmt::Debug for Operation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operation::{:?}", self.kind())
    }
}

/// Result of a successful [`Operation`].
pub enum Outcome {
    /// The opened file, ready to be streamed to the client.
    Contents(FileReader),
    /// Number of body bytes written.
    Written(u64),
    Deleted,
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contents(_) => f.write_str("Contents(..)"),
            Self::Written(bytes) => f.debug_tuple("Written").field(bytes).finish(),
            Self::Deleted => f.write_str("Deleted"),
        }
    }
}

/// Storage the dispatcher operates on.
///
/// Implementations must be `Send + Sync`; one backend serves every request
/// concurrently and holds no per-request state.
#[async_trait]
pub trait FileBackend: Send + Sync {
    /// Open a file for reading.
    ///
    /// # Errors
    /// Returns [`ExecutorError::NotFound`] if `path` does not exist or is a
    /// directory, [`ExecutorError::Io`] for any other failure.
    async fn read(&self, path: &Path) -> Result<FileReader, ExecutorError>;

    /// Create missing parent directories, open the file with the given
    /// positioning, and copy `source` into it until end of stream.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Io`] on any create, open or write failure.
    async fn write(
        &self,
        path: &Path,
        mode: WriteMode,
        source: ByteSource<'_>,
    ) -> Result<u64, ExecutorError>;

    /// Remove a file.
    ///
    /// # Errors
    /// Returns [`ExecutorError::NotFound`] if `path` does not exist,
    /// [`ExecutorError::Io`] for any other failure.
    async fn delete(&self, path: &Path) -> Result<(), ExecutorError>;

    /// Run a tagged operation against `path`.
    ///
    /// # Errors
    /// Propagates the error of the underlying operation.
    async fn execute(&self, path: &Path, operation: Operation<'_>) -> Result<Outcome, ExecutorError> {
        match operation {
            Operation::Read => self.read(path).await.map(Outcome::Contents),
            Operation::AppendWrite(source) => self
                .write(path, WriteMode::Append, source)
                .await
                .map(Outcome::Written),
            Operation::TruncateWrite(source) => self
                .write(path, WriteMode::Truncate, source)
                .await
                .map(Outcome::Written),
            Operation::Delete => self.delete(path).await.map(|()| Outcome::Deleted),
        }
    }
}

/// Read and discard whatever remains of `source`.
///
/// # Errors
/// Returns the I/O error that interrupted the stream.
pub async fn drain(source: ByteSource<'_>) -> std::io::Result<u64> {
    tokio::io::copy(source, &mut tokio::io::sink()).await
}
