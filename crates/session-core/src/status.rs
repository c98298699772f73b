use std::fmt;

/// Outcome of presenting a token to the admission controller.
///
/// The string forms are what the transports send back to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// A new session was admitted.
    Created,
    /// The session already existed; its expiry window was reset.
    Exists,
    /// Malformed token or blacklisted subscriber.
    Rejected,
    /// The service is draining sessions and admits nothing new.
    RejectedShuttingDown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Created => "created",
            Status::Exists => "exists",
            Status::Rejected => "rejected",
            Status::RejectedShuttingDown => "rejected (server shutting down)",
        }
    }

    /// `true` when the subscriber holds a session after the call.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Status::Created | Status::Exists)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
