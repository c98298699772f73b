use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::entry::AuditRecord;

/// Errors that can occur during audit log I/O.
#[derive(Debug, thiserror::Error)]
pub enum AuditWriteError {
    #[error("failed to open audit log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write to audit log: {0}")]
    Write(std::io::Error),

    #[error("failed to flush audit log: {0}")]
    Flush(std::io::Error),
}

/// Open (or create) `path` for appending, creating missing parent
/// directories first.
pub(crate) async fn open_append(path: &Path) -> std::io::Result<tokio::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
}

/// Append-only file writer for CDR lines.
///
/// Every [`append`](Self::append) writes exactly one line and flushes it, so
/// a record is on disk by the time the call returns.
pub struct AuditWriter {
    file: tokio::fs::File,
}

impl AuditWriter {
    /// Open (or create) the CDR file at `path` in append mode, creating
    /// parent directories as needed.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, AuditWriteError> {
        let path = path.as_ref();
        let file = open_append(path)
            .await
            .map_err(|source| AuditWriteError::OpenFile {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self { file })
    }

    /// Write one record as a single line and flush it to disk.
    pub async fn append(&mut self, record: &AuditRecord) -> Result<(), AuditWriteError> {
        self.file
            .write_all(record.to_line().as_bytes())
            .await
            .map_err(AuditWriteError::Write)?;
        self.flush().await
    }

    /// Flush any buffered data to disk.
    pub async fn flush(&mut self) -> Result<(), AuditWriteError> {
        self.file.flush().await.map_err(AuditWriteError::Flush)
    }
}
