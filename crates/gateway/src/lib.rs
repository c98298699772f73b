//! Transport front ends for subscriber-gate.
//!
//! Both adapters are thin: they turn a request into a call on a
//! [`SessionManager`](session_core::SessionManager) and write a one-line
//! trace of each exchange to the diagnostic log.
//!
//! ```text
//! UE --UDP token--> UdpFrontend  --handle()-->    SessionManager
//! ops --HTTP GET--> HttpFrontend --is_active()--> SessionManager
//! ```
//!
//! Both stop when the shared `tokio::sync::broadcast` shutdown channel
//! fires; `GET /stop` fires it.

pub mod http;
pub mod udp;

pub use http::{router, HttpFrontend};
pub use udp::{UdpFrontend, MAX_DATAGRAM};

use std::net::SocketAddr;

/// Errors raised while setting up or running a front end.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("transport I/O error: {0}")]
    Io(std::io::Error),
}
