use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::entry::{AuditAction, AuditRecord};
use crate::writer::{AuditWriteError, AuditWriter};

/// Owner of the CDR stream.
///
/// All writers serialise through the recorder's own mutex. Callers that
/// hold the session store lock may call [`record`](Self::record); the
/// recorder never reaches back into the store, so the lock order is always
/// store then audit.
pub struct AuditRecorder {
    path: PathBuf,
    writer: Mutex<Option<AuditWriter>>,
}

impl AuditRecorder {
    /// Open the CDR file in append mode. Failure here is fatal for the
    /// caller: the service must not admit sessions without an audit trail.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditWriteError> {
        let path = path.as_ref().to_path_buf();
        let writer = AuditWriter::new(&path).await?;
        tracing::debug!(path = %path.display(), "CDR file opened");
        Ok(Self {
            path,
            writer: Mutex::new(Some(writer)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. I/O failures are logged and swallowed so the
    /// admission path never fails because of the audit sink.
    pub async fn record(&self, id: &str, action: AuditAction) {
        let record = AuditRecord::new(id, action);
        let mut guard = self.writer.lock().await;

        let Some(writer) = guard.as_mut() else {
            tracing::warn!(imsi = id, %action, "CDR stream closed; record dropped");
            return;
        };

        if let Err(err) = writer.append(&record).await {
            tracing::error!(%err, imsi = id, %action, "failed to write CDR record");
        }
    }

    /// Flush and release the stream. Later records are dropped.
    pub async fn close(&self) {
        let mut guard = self.writer.lock().await;
        if let Some(mut writer) = guard.take() {
            if let Err(err) = writer.flush().await {
                tracing::error!(%err, "failed to flush CDR file on close");
            }
            tracing::debug!(path = %self.path.display(), "CDR file closed");
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.writer.lock().await.is_none()
    }
}
