use async_trait::async_trait;

use crate::status::Status;

/// What a transport front end needs from the session core.
///
/// [`AdmissionController`](crate::AdmissionController) is the production
/// implementation; transports hold an `Arc<dyn SessionManager>` so tests can
/// substitute a double.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Present a raw token for admission.
    async fn handle(&self, raw_token: &str) -> Status;

    /// Whether `id` currently holds a session. The id is looked up exactly
    /// as given; callers must pass an already normalized identifier.
    async fn is_active(&self, id: &str) -> bool;
}
