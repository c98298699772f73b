use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::admission::AdmissionController;
use crate::scheduler::ExpiryScheduler;

/// Paced, audited teardown of the session core.
///
/// Steps, in order:
/// 1. refuse new admissions;
/// 2. stop the expiry scheduler and wait for it;
/// 3. remove sessions one at a time with a `shutdown_remove` record,
///    sleeping `pace` between removals;
/// 4. close the CDR stream.
///
/// There is no overall timeout: a large table with a long pace blocks for
/// `len * pace`.
pub struct ShutdownCoordinator {
    controller: Arc<AdmissionController>,
    scheduler: Arc<ExpiryScheduler>,
    pace: Duration,
}

impl ShutdownCoordinator {
    pub fn new(
        controller: Arc<AdmissionController>,
        scheduler: Arc<ExpiryScheduler>,
        pace: Duration,
    ) -> Self {
        Self {
            controller,
            scheduler,
            pace,
        }
    }

    /// Run the teardown and return how many sessions were drained.
    ///
    /// Meant to be called once. A second call finds the store empty and
    /// only repeats the (idempotent) stream close.
    pub async fn run(&self) -> usize {
        let store = self.controller.store();
        self.controller.begin_shutdown();
        store.logger().send_to_log("Starting graceful shutdown...");
        let sessions = store.len().await;
        info!(
            sessions,
            pace_ms = self.pace.as_millis() as u64,
            "graceful shutdown started"
        );

        self.scheduler.stop().await;

        let mut drained = 0;
        while let Some(id) = store.drain_one().await {
            drained += 1;
            store
                .logger()
                .send_to_log(format!("Shutdown remove IMSI: {id}"));
            tokio::time::sleep(self.pace).await;
        }

        store.close_audit().await;
        info!(drained, "graceful shutdown complete");
        drained
    }
}
