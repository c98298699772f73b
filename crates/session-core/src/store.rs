use std::collections::HashMap;
use std::time::Duration;

use audit_log::{AsyncLogger, AuditAction, AuditRecorder};
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, info};

/// One admitted subscriber. Presence in the store is what makes a session
/// active; removed sessions leave no tombstone.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    /// Creation time, or the time of the last re-presentation.
    pub created_at: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            created_at: Instant::now(),
        }
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}

/// Keyed table of active sessions.
///
/// Every operation runs inside one exclusive section obtained with
/// [`lock`](Self::lock). Audit records for an operation are written while
/// that section is held, so the CDR file and the table change together.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    timeout: Duration,
    audit: AuditRecorder,
    logger: AsyncLogger,
}

impl SessionStore {
    pub fn new(timeout: Duration, audit: AuditRecorder, logger: AsyncLogger) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout,
            audit,
            logger,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn logger(&self) -> &AsyncLogger {
        &self.logger
    }

    pub fn audit(&self) -> &AuditRecorder {
        &self.audit
    }

    /// Enter the store's critical section.
    pub async fn lock(&self) -> SessionTable<'_> {
        SessionTable {
            sessions: self.sessions.lock().await,
            audit: &self.audit,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Evict every session idle for longer than the timeout, writing one
    /// `timeout_remove` record each. Holds the lock for the whole scan.
    pub async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut table = self.lock().await;

        let expired: Vec<String> = table
            .sessions
            .iter()
            .filter(|(_, session)| session.age(now) > self.timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            table.record(id, AuditAction::TimeoutRemove).await;
            table.sessions.remove(id);
            self.logger.send_to_log(format!("Timeout remove IMSI: {id}"));
            info!(imsi = %id, "session expired");
        }

        if !expired.is_empty() {
            debug!(removed = expired.len(), remaining = table.len(), "expiry sweep");
        }
        expired.len()
    }

    /// Remove one arbitrary session with a `shutdown_remove` record and
    /// return its id, or `None` when the store is empty. The lock is
    /// released before returning.
    pub async fn drain_one(&self) -> Option<String> {
        let mut table = self.lock().await;
        let id = table.sessions.keys().next().cloned()?;
        table.record(&id, AuditAction::ShutdownRemove).await;
        table.sessions.remove(&id);
        Some(id)
    }

    /// Flush and release the CDR stream.
    pub async fn close_audit(&self) {
        self.audit.close().await;
    }
}

/// Guard over the session table. Dropping it leaves the critical section.
pub struct SessionTable<'a> {
    sessions: MutexGuard<'a, HashMap<String, Session>>,
    audit: &'a AuditRecorder,
}

impl SessionTable<'_> {
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Reset the expiry window of an existing session. Returns `false` when
    /// there is no such session.
    pub fn refresh(&mut self, id: &str) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) => {
                // Instant is monotonic, so this never moves backwards.
                session.created_at = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Insert a fresh session. An existing entry is replaced.
    pub fn insert(&mut self, id: &str) {
        self.sessions.insert(id.to_string(), Session::new());
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Write an audit record while the table is locked.
    pub async fn record(&self, id: &str, action: AuditAction) {
        self.audit.record(id, action).await;
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    async fn store_in(dir: &Path, timeout: Duration) -> SessionStore {
        let audit = AuditRecorder::open(dir.join("cdr.log")).await.unwrap();
        let logger = AsyncLogger::open(dir.join("server.log")).await.unwrap();
        SessionStore::new(timeout, audit, logger)
    }

    fn cdr_lines(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("cdr.log"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn insert_refresh_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), Duration::from_secs(5)).await;

        let mut table = store.lock().await;
        assert!(!table.refresh("1"));
        table.insert("1");
        let first = table.get("1").unwrap().created_at;
        assert!(table.refresh("1"));
        assert!(table.get("1").unwrap().created_at >= first);
        assert!(table.remove("1"));
        assert!(!table.remove("1"));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn sweep_keeps_fresh_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), Duration::from_secs(60)).await;
        store.lock().await.insert("1");

        assert_eq!(store.sweep_expired().await, 0);
        assert_eq!(store.len().await, 1);
        assert!(cdr_lines(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn sweep_evicts_stale_sessions_with_one_record_each() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), Duration::from_millis(50)).await;
        {
            let mut table = store.lock().await;
            table.insert("1");
            table.insert("2");
        }
        tokio::time::sleep(Duration::from_millis(120)).await;
        store.lock().await.insert("3");

        assert_eq!(store.sweep_expired().await, 2);
        assert_eq!(store.sweep_expired().await, 0);

        let table = store.lock().await;
        assert!(table.contains("3"));
        assert_eq!(table.len(), 1);
        drop(table);

        let lines = cdr_lines(dir.path());
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.ends_with(", timeout_remove")));
    }

    #[tokio::test]
    async fn drain_one_until_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), Duration::from_secs(60)).await;
        {
            let mut table = store.lock().await;
            table.insert("10");
            table.insert("20");
        }

        let mut drained = vec![
            store.drain_one().await.unwrap(),
            store.drain_one().await.unwrap(),
        ];
        assert_eq!(store.drain_one().await, None);
        drained.sort();
        assert_eq!(drained, vec!["10", "20"]);
        assert!(store.is_empty().await);

        let lines = cdr_lines(dir.path());
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.ends_with(", shutdown_remove")));
    }
}
