use std::sync::Arc;

use audit_log::{AsyncLogger, AuditRecorder, AuditWriteError};
use thiserror::Error;
use tracing::info;

use crate::admission::AdmissionController;
use crate::blacklist::Blacklist;
use crate::config::CoreConfig;
use crate::manager::SessionManager;
use crate::scheduler::ExpiryScheduler;
use crate::shutdown::ShutdownCoordinator;
use crate::status::Status;
use crate::store::SessionStore;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cannot open CDR file: {0}")]
    Audit(#[from] AuditWriteError),
}

/// The assembled session core: store, admission, expiry and teardown.
///
/// The diagnostic logger is owned by the caller, who also starts and stops
/// it; the core only enqueues messages.
pub struct SessionCore {
    controller: Arc<AdmissionController>,
    scheduler: Arc<ExpiryScheduler>,
    coordinator: ShutdownCoordinator,
    logger: AsyncLogger,
}

impl SessionCore {
    /// Open the CDR file and wire the components together. Failing to open
    /// the CDR file is fatal.
    pub async fn new(config: &CoreConfig, logger: AsyncLogger) -> Result<Self, CoreError> {
        let audit = AuditRecorder::open(&config.cdr_file).await?;
        let store = Arc::new(SessionStore::new(
            config.session_timeout(),
            audit,
            logger.clone(),
        ));
        let controller = Arc::new(AdmissionController::new(
            Arc::clone(&store),
            Blacklist::new(config.blacklist.iter().cloned()),
        ));
        let scheduler = Arc::new(ExpiryScheduler::new(store));
        let coordinator = ShutdownCoordinator::new(
            Arc::clone(&controller),
            Arc::clone(&scheduler),
            config.shutdown_pace(),
        );

        info!(
            timeout_sec = config.session_timeout_sec,
            shutdown_rate_ms = config.graceful_shutdown_rate,
            cdr_file = %config.cdr_file.display(),
            blacklisted = config.blacklist.len(),
            "session core initialized"
        );

        Ok(Self {
            controller,
            scheduler,
            coordinator,
            logger,
        })
    }

    pub async fn handle(&self, raw_token: &str) -> Status {
        self.controller.handle(raw_token).await
    }

    pub async fn is_active(&self, token: &str) -> bool {
        self.controller.is_active(token).await
    }

    pub async fn start_scheduler(&self) {
        self.scheduler.start().await;
    }

    pub async fn stop_scheduler(&self) {
        self.scheduler.stop().await;
    }

    /// Drain all sessions and close the CDR stream. Returns the number of
    /// sessions drained.
    pub async fn shutdown(&self) -> usize {
        self.coordinator.run().await
    }

    /// Handle for transports.
    pub fn manager(&self) -> Arc<dyn SessionManager> {
        Arc::clone(&self.controller) as Arc<dyn SessionManager>
    }

    pub fn controller(&self) -> &Arc<AdmissionController> {
        &self.controller
    }

    pub fn logger(&self) -> &AsyncLogger {
        &self.logger
    }
}
