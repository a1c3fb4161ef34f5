//! [`FileBackend`] on the local filesystem.

use std::path::Path;

use async_trait::async_trait;
use tokio::fs::{self, DirBuilder, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::backend::{ByteSource, FileBackend, FileReader, WriteMode};
use crate::ExecutorError;

/// Operates directly on paths of the host filesystem.
///
/// Files are created with mode `0644` and directories with `0755` on Unix.
/// There is no locking: concurrent writers to one path interleave however
/// the operating system schedules them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFsBackend;

impl LocalFsBackend {
    /// Create a backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

async fn create_parent_dirs(path: &Path) -> Result<(), ExecutorError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(httpfs_core::DIR_MODE);
    builder
        .create(parent)
        .await
        .map_err(|e| ExecutorError::io("creating directories for", path, e))
}

#[async_trait]
impl FileBackend for LocalFsBackend {
    async fn read(&self, path: &Path) -> Result<FileReader, ExecutorError> {
        let file = File::open(path)
            .await
            .map_err(|e| ExecutorError::lookup("opening", path, e))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| ExecutorError::io("inspecting", path, e))?;
        if metadata.is_dir() {
            return Err(ExecutorError::NotFound {
                path: path.to_owned(),
            });
        }
        Ok(Box::new(file))
    }

    async fn write(
        &self,
        path: &Path,
        mode: WriteMode,
        source: ByteSource<'_>,
    ) -> Result<u64, ExecutorError> {
        create_parent_dirs(path).await?;

        let mut options = OpenOptions::new();
        options.write(true).create(true);
        match mode {
            WriteMode::Append => options.append(true),
            WriteMode::Truncate => options.truncate(true),
        };
        #[cfg(unix)]
        options.mode(httpfs_core::FILE_MODE);

        let mut file = options
            .open(path)
            .await
            .map_err(|e| ExecutorError::io("opening", path, e))?;
        let written = tokio::io::copy(source, &mut file)
            .await
            .map_err(|e| ExecutorError::io("writing payload to", path, e))?;
        file.flush()
            .await
            .map_err(|e| ExecutorError::io("flushing", path, e))?;

        tracing::debug!(path = %path.display(), ?mode, bytes = written, "write complete");
        Ok(written)
    }

    async fn delete(&self, path: &Path) -> Result<(), ExecutorError> {
        fs::remove_file(path)
            .await
            .map_err(|e| ExecutorError::lookup("deleting", path, e))
    }
}
