use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use audit_log::AuditAction;
use tracing::{debug, info};

use crate::blacklist::Blacklist;
use crate::imsi::Imsi;
use crate::manager::SessionManager;
use crate::status::Status;
use crate::store::SessionStore;

/// Validates incoming tokens and applies the blacklist before touching the
/// session store.
pub struct AdmissionController {
    store: Arc<SessionStore>,
    blacklist: Blacklist,
    shutting_down: AtomicBool,
}

impl AdmissionController {
    pub fn new(store: Arc<SessionStore>, blacklist: Blacklist) -> Self {
        Self {
            store,
            blacklist,
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Refuse all further admissions with
    /// [`Status::RejectedShuttingDown`].
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Admit, refresh or reject a raw token.
    ///
    /// Malformed tokens are rejected before any store access and are not
    /// audited. Everything else is decided inside the store's critical
    /// section: blacklist check, lookup-or-create and the audit record
    /// happen as one step.
    pub async fn handle(&self, raw_token: &str) -> Status {
        let imsi = match Imsi::normalize(raw_token) {
            Ok(imsi) => imsi,
            Err(err) => {
                debug!(raw = raw_token, %err, "token rejected");
                return Status::Rejected;
            }
        };

        if self.is_shutting_down() {
            return Status::RejectedShuttingDown;
        }

        let id = imsi.as_str();
        let mut table = self.store.lock().await;

        // Shutdown may have begun while this call waited for the lock; the
        // drain must not miss a session it cannot see.
        if self.is_shutting_down() {
            return Status::RejectedShuttingDown;
        }

        if self.blacklist.contains(id) {
            table.record(id, AuditAction::RejectedBlacklist).await;
            self.store
                .logger()
                .send_to_log(format!("Session rejected for IMSI: {id}"));
            info!(imsi = id, "session rejected: blacklisted");
            return Status::Rejected;
        }

        if table.refresh(id) {
            debug!(imsi = id, "session refreshed");
            return Status::Exists;
        }

        table.insert(id);
        table.record(id, AuditAction::Created).await;
        self.store.logger().send_to_log(format!("Created: {id}"));
        info!(imsi = id, "session created");
        Status::Created
    }

    /// Look `token` up verbatim. No normalization is applied, so `"12-34"`
    /// misses a session stored as `"1234"`.
    pub async fn is_active(&self, token: &str) -> bool {
        self.store.lock().await.contains(token)
    }
}

#[async_trait]
impl SessionManager for AdmissionController {
    async fn handle(&self, raw_token: &str) -> Status {
        AdmissionController::handle(self, raw_token).await
    }

    async fn is_active(&self, id: &str) -> bool {
        AdmissionController::is_active(self, id).await
    }
}
