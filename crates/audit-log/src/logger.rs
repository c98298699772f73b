use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Local;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;

use crate::entry::format_timestamp;
use crate::writer::open_append;

/// Upper bound on how long the writer task sleeps with nothing to do.
const IDLE_WAIT: Duration = Duration::from_secs(1);

/// How long [`AsyncLogger::flush`] gives the writer once woken.
const FLUSH_GRACE: Duration = Duration::from_millis(10);

/// Errors raised while setting up the diagnostic log.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Decoupled, queue-backed diagnostic log.
///
/// Producers call [`send_to_log`](Self::send_to_log), which pushes onto an
/// unbounded channel and returns immediately. A single writer task owns the
/// file and appends each message as `[<timestamp>] <message>`.
///
/// The handle is cheap to clone; every clone feeds the same queue.
///
/// Lifecycle: a freshly opened logger queues messages but writes nothing
/// until [`start`](Self::start). [`stop`](Self::stop) writes everything
/// still queued and closes the file; anything sent afterwards is dropped.
#[derive(Clone)]
pub struct AsyncLogger {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    tx: mpsc::UnboundedSender<String>,
    pending: AtomicUsize,
    running: AtomicBool,
    wake: Notify,
    state: Mutex<State>,
    /// Flips to `true` once the first `stop()` has closed the file.
    closed: watch::Sender<bool>,
}

enum State {
    Idle {
        writer: LogWriter,
        rx: mpsc::UnboundedReceiver<String>,
    },
    Running(JoinHandle<(LogWriter, mpsc::UnboundedReceiver<String>)>),
    Stopped,
}

impl AsyncLogger {
    /// Open (or create) the log file for appending. The writer task is not
    /// spawned until [`start`](Self::start).
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let file = open_append(&path).await.map_err(|source| LogError::Open {
            path: path.clone(),
            source,
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let writer = LogWriter {
            out: BufWriter::new(file),
        };

        Ok(Self {
            inner: Arc::new(Inner {
                path,
                tx,
                pending: AtomicUsize::new(0),
                running: AtomicBool::new(false),
                wake: Notify::new(),
                state: Mutex::new(State::Idle { writer, rx }),
                closed: watch::channel(false).0,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Spawn the writer task. Calling this while running is a no-op; a
    /// stopped logger cannot be restarted because its file is closed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut state = self.lock_state();
        match std::mem::replace(&mut *state, State::Stopped) {
            State::Idle { writer, rx } => {
                self.inner.running.store(true, Ordering::Release);
                let inner = Arc::clone(&self.inner);
                *state = State::Running(tokio::spawn(run_writer_loop(inner, writer, rx)));
                tracing::debug!(path = %self.inner.path.display(), "log writer started");
            }
            State::Running(handle) => *state = State::Running(handle),
            State::Stopped => {
                tracing::warn!("log writer already stopped; start ignored");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Queue `message` for the writer task. Never blocks.
    pub fn send_to_log(&self, message: impl Into<String>) {
        // Count before sending so the writer can never decrement first.
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        if self.inner.tx.send(message.into()).is_err() {
            self.inner.pending.fetch_sub(1, Ordering::AcqRel);
            tracing::trace!("log writer stopped; message dropped");
        }
    }

    /// Alias of [`send_to_log`](Self::send_to_log).
    pub fn log(&self, message: impl Into<String>) {
        self.send_to_log(message);
    }

    /// Messages queued but not yet written.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Nudge the writer and give it a moment. This is a hint, not a
    /// barrier: the queue may still hold messages when it returns.
    pub async fn flush(&self) {
        if self.pending() > 0 {
            self.inner.wake.notify_one();
            tokio::time::sleep(FLUSH_GRACE).await;
        }
    }

    /// Stop the writer task, write every message still queued and close the
    /// file. Idempotent: a concurrent or later call returns only once the
    /// first one has finished closing the file.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), State::Stopped);
        self.inner.running.store(false, Ordering::Release);
        self.inner.wake.notify_one();

        let (mut writer, mut rx) = match previous {
            State::Running(handle) => match handle.await {
                Ok(parts) => parts,
                Err(err) => {
                    tracing::error!(%err, "log writer task failed; queued messages lost");
                    self.inner.closed.send_replace(true);
                    return;
                }
            },
            State::Idle { writer, rx } => (writer, rx),
            State::Stopped => {
                let mut closed = self.inner.closed.subscribe();
                // The sender lives in `inner`, so this only ends on `true`.
                let _ = closed.wait_for(|done| *done).await;
                return;
            }
        };

        // Refuse new messages, then write whatever slipped in after the
        // task's own final drain.
        rx.close();
        drain_queue(&self.inner, &mut writer, &mut rx).await;
        writer.close().await;
        self.inner.closed.send_replace(true);
        tracing::debug!(path = %self.inner.path.display(), "log writer stopped");
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

struct LogWriter {
    out: BufWriter<tokio::fs::File>,
}

impl LogWriter {
    async fn write_message(&mut self, message: &str) {
        let line = format!("[{}] {}\n", format_timestamp(&Local::now()), message);
        if let Err(err) = self.out.write_all(line.as_bytes()).await {
            tracing::error!(%err, "failed to write log message");
        }
    }

    async fn flush(&mut self) {
        if let Err(err) = self.out.flush().await {
            tracing::error!(%err, "failed to flush log file");
        }
    }

    async fn close(mut self) {
        self.flush().await;
        if let Err(err) = self.out.shutdown().await {
            tracing::error!(%err, "failed to close log file");
        }
    }
}

/// Body of the writer task. Returns the writer and queue so that
/// [`AsyncLogger::stop`] can finish any stragglers.
async fn run_writer_loop(
    inner: Arc<Inner>,
    mut writer: LogWriter,
    mut rx: mpsc::UnboundedReceiver<String>,
) -> (LogWriter, mpsc::UnboundedReceiver<String>) {
    while inner.running.load(Ordering::Acquire) {
        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(message) => {
                    writer.write_message(&message).await;
                    inner.pending.fetch_sub(1, Ordering::AcqRel);
                }
                // `inner` owns a sender, so the channel cannot close here.
                None => break,
            },
            _ = inner.wake.notified() => {}
            _ = tokio::time::sleep(IDLE_WAIT) => {}
        }

        drain_queue(&inner, &mut writer, &mut rx).await;
        writer.flush().await;
    }

    drain_queue(&inner, &mut writer, &mut rx).await;
    writer.flush().await;
    (writer, rx)
}

async fn drain_queue(
    inner: &Inner,
    writer: &mut LogWriter,
    rx: &mut mpsc::UnboundedReceiver<String>,
) {
    while let Ok(message) = rx.try_recv() {
        writer.write_message(&message).await;
        inner.pending.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn is_timestamped(line: &str, message: &str) -> bool {
        // "[YYYY-MM-DD HH:MM:SS] " is 22 bytes.
        let bytes = line.as_bytes();
        line.len() == 22 + message.len()
            && bytes[0] == b'['
            && bytes[20] == b']'
            && bytes[21] == b' '
            && bytes[5] == b'-'
            && bytes[8] == b'-'
            && bytes[11] == b' '
            && bytes[14] == b':'
            && bytes[17] == b':'
            && line[1..5].chars().all(|c| c.is_ascii_digit())
            && line.ends_with(message)
    }

    #[tokio::test]
    async fn open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");
        let _logger = AsyncLogger::open(&path).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn open_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = AsyncLogger::open(dir.path()).await.err().unwrap();
        assert!(err.to_string().contains("failed to open log file"));
    }

    #[tokio::test]
    async fn writes_single_timestamped_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");
        let logger = AsyncLogger::open(&path).await.unwrap();

        logger.start();
        logger.send_to_log("Timestamp test");
        logger.flush().await;
        logger.stop().await;

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        assert!(is_timestamped(&lines[0], "Timestamp test"), "bad line: {}", lines[0]);
    }

    #[tokio::test]
    async fn messages_sent_before_start_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");
        let logger = AsyncLogger::open(&path).await.unwrap();

        logger.log("early");
        assert_eq!(logger.pending(), 1);
        logger.start();
        logger.start();
        assert!(logger.is_running());
        logger.stop().await;

        assert_eq!(logger.pending(), 0);
        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("] early"));
    }

    #[tokio::test]
    async fn messages_after_stop_vanish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");
        let logger = AsyncLogger::open(&path).await.unwrap();

        logger.start();
        logger.log("kept");
        logger.stop().await;
        logger.stop().await;
        logger.log("lost");
        logger.start();
        assert!(!logger.is_running());

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("] kept"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_producers_lose_nothing() {
        const PRODUCERS: usize = 5;
        const MESSAGES: usize = 20;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");
        let logger = AsyncLogger::open(&path).await.unwrap();
        logger.start();

        let mut handles = Vec::new();
        for p in 0..PRODUCERS {
            let logger = logger.clone();
            handles.push(tokio::spawn(async move {
                for m in 0..MESSAGES {
                    logger.send_to_log(format!("{p}_{m}"));
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        logger.flush().await;
        logger.stop().await;

        let lines = read_lines(&path);
        assert_eq!(lines.len(), PRODUCERS * MESSAGES);

        let mut seen: Vec<String> = lines
            .iter()
            .map(|l| l.split_once("] ").unwrap().1.to_string())
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), PRODUCERS * MESSAGES);

        // Per-producer order is preserved.
        for p in 0..PRODUCERS {
            let prefix = format!("{p}_");
            let order: Vec<usize> = lines
                .iter()
                .filter_map(|l| l.split_once("] ").unwrap().1.strip_prefix(&prefix))
                .map(|n| n.parse().unwrap())
                .collect();
            assert_eq!(order, (0..MESSAGES).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn stop_without_start_drains_queue() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");
        let logger = AsyncLogger::open(&path).await.unwrap();

        logger.log("one");
        logger.log("two");
        logger.stop().await;

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("] two"));
    }

    #[tokio::test]
    async fn concurrent_stop_waits_for_drain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");
        let logger = AsyncLogger::open(&path).await.unwrap();
        for i in 0..500 {
            logger.log(format!("message {i}"));
        }
        logger.start();

        let first = logger.clone();
        let second = logger.clone();
        let path_ref = &path;
        let ((), lines_seen_by_second) = tokio::join!(first.stop(), async move {
            second.stop().await;
            read_lines(path_ref).len()
        });

        assert_eq!(lines_seen_by_second, 500);
        assert_eq!(logger.pending(), 0);
    }

    #[tokio::test]
    async fn appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");
        std::fs::write(&path, "previous run\n").unwrap();

        let logger = AsyncLogger::open(&path).await.unwrap();
        logger.start();
        logger.log("this run");
        logger.stop().await;

        let lines = read_lines(&path);
        assert_eq!(lines[0], "previous run");
        assert!(lines[1].ends_with("] this run"));
    }
}
