use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::store::SessionStore;

/// Interval between expiry sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Periodic task that evicts idle sessions from a [`SessionStore`].
pub struct ExpiryScheduler {
    store: Arc<SessionStore>,
    interval: Duration,
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ExpiryScheduler {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self::with_interval(store, SWEEP_INTERVAL)
    }

    pub fn with_interval(store: Arc<SessionStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(Notify::new()),
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawn the sweep task. A no-op while it is already running. The first
    /// sweep happens one interval after start.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return;
        }

        self.running.store(true, Ordering::Release);
        let store = Arc::clone(&self.store);
        let running = Arc::clone(&self.running);
        let stop = Arc::clone(&self.stop);
        let period = self.interval;

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            while running.load(Ordering::Acquire) {
                tokio::select! {
                    _ = ticker.tick() => {
                        store.sweep_expired().await;
                    }
                    _ = stop.notified() => {}
                }
            }
            debug!("expiry scheduler exited");
        }));
        debug!(interval_ms = period.as_millis() as u64, "expiry scheduler started");
    }

    /// Signal the sweep task and wait for it to exit. The scheduler can be
    /// started again afterwards.
    pub async fn stop(&self) {
        let mut task = self.task.lock().await;
        let Some(handle) = task.take() else {
            return;
        };

        self.running.store(false, Ordering::Release);
        self.stop.notify_one();

        if let Err(err) = handle.await {
            error!(%err, "expiry scheduler task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_log::{AsyncLogger, AuditRecorder};
    use std::path::Path;

    async fn store_in(dir: &Path, timeout: Duration) -> Arc<SessionStore> {
        let audit = AuditRecorder::open(dir.join("cdr.log")).await.unwrap();
        let logger = AsyncLogger::open(dir.join("server.log")).await.unwrap();
        Arc::new(SessionStore::new(timeout, audit, logger))
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = ExpiryScheduler::new(store_in(dir.path(), Duration::from_secs(5)).await);

        scheduler.stop().await;
        scheduler.start().await;
        scheduler.start().await;
        assert!(scheduler.is_running());
        scheduler.stop().await;
        assert!(!scheduler.is_running());
        scheduler.stop().await;

        // Restartable.
        scheduler.start().await;
        assert!(scheduler.is_running());
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn evicts_idle_sessions_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), Duration::from_millis(100)).await;
        let scheduler =
            ExpiryScheduler::with_interval(Arc::clone(&store), Duration::from_millis(50));

        store.lock().await.insert("001010123456789");
        scheduler.start().await;

        let mut gone = false;
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(25)).await;
            if !store.lock().await.contains("001010123456789") {
                gone = true;
                break;
            }
        }
        scheduler.stop().await;
        assert!(gone, "session was never swept");

        let content = std::fs::read_to_string(dir.path().join("cdr.log")).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains(", 001010123456789, timeout_remove"));
    }

    #[tokio::test]
    async fn stop_returns_promptly_mid_interval() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = ExpiryScheduler::new(store_in(dir.path(), Duration::from_secs(5)).await);
        scheduler.start().await;

        let started = std::time::Instant::now();
        scheduler.stop().await;
        assert!(started.elapsed() < SWEEP_INTERVAL);
    }
}
