use std::net::SocketAddr;
use std::sync::Arc;

use audit_log::AsyncLogger;
use session_core::SessionManager;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use crate::GatewayError;

/// Largest datagram read from a client.
pub const MAX_DATAGRAM: usize = 1024;

/// Datagram front end: one token per datagram, status string as the reply.
pub struct UdpFrontend {
    socket: Arc<UdpSocket>,
    manager: Arc<dyn SessionManager>,
    logger: AsyncLogger,
}

impl UdpFrontend {
    pub async fn bind(
        addr: SocketAddr,
        manager: Arc<dyn SessionManager>,
        logger: AsyncLogger,
    ) -> Result<Self, GatewayError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;
        logger.send_to_log("Bind UDP socket");
        Ok(Self {
            socket: Arc::new(socket),
            manager,
            logger,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, GatewayError> {
        self.socket.local_addr().map_err(GatewayError::Io)
    }

    /// Serve datagrams until `shutdown` fires. Each datagram is handled in
    /// its own task; receive and send failures are logged and skipped.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut buf = [0u8; MAX_DATAGRAM];
        tracing::info!(addr = ?self.socket.local_addr().ok(), "UDP front end listening");

        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => {
                    let (len, peer) = match received {
                        Ok(r) => r,
                        Err(err) => {
                            self.logger.send_to_log("Failed to receive data");
                            tracing::warn!(%err, "UDP receive failed");
                            continue;
                        }
                    };

                    let raw = String::from_utf8_lossy(&buf[..len]).into_owned();
                    let socket = Arc::clone(&self.socket);
                    let manager = Arc::clone(&self.manager);
                    let logger = self.logger.clone();
                    tokio::spawn(async move {
                        handle_datagram(&socket, manager.as_ref(), &logger, raw, peer).await;
                    });
                }
                _ = shutdown.recv() => {
                    tracing::info!("UDP front end stopping");
                    return;
                }
            }
        }
    }
}

async fn handle_datagram(
    socket: &UdpSocket,
    manager: &dyn SessionManager,
    logger: &AsyncLogger,
    raw: String,
    peer: SocketAddr,
) {
    logger.send_to_log(format!("IMSI from UE: {raw}"));
    let status = manager.handle(&raw).await;

    match socket.send_to(status.as_str().as_bytes(), peer).await {
        Ok(_) => logger.send_to_log(format!("Send to UE: {raw}, {status}")),
        Err(err) => {
            logger.send_to_log("Failed to send data");
            tracing::warn!(%err, %peer, "UDP reply failed");
        }
    }
}
