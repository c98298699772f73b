use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use audit_log::AsyncLogger;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use session_core::SessionManager;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::GatewayError;

/// Delay between answering `/stop` and firing the shutdown signal, so the
/// response reaches the caller first.
const STOP_DELAY: Duration = Duration::from_millis(100);

#[derive(Clone)]
struct AppState {
    manager: Arc<dyn SessionManager>,
    logger: AsyncLogger,
    shutdown: broadcast::Sender<()>,
}

/// Build the HTTP routes:
///
/// * `GET /check_subscriber?imsi=<id>` answers `active` or `not active`;
/// * `GET /stop` asks the whole process to shut down via `shutdown`.
pub fn router(
    manager: Arc<dyn SessionManager>,
    logger: AsyncLogger,
    shutdown: broadcast::Sender<()>,
) -> Router {
    Router::new()
        .route("/check_subscriber", get(check_subscriber))
        .route("/stop", get(stop))
        .with_state(AppState {
            manager,
            logger,
            shutdown,
        })
}

async fn check_subscriber(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> (StatusCode, &'static str) {
    // A repeated `imsi` key is not an error; the first value wins.
    let imsi = params.into_iter().find(|(key, _)| key == "imsi");
    let imsi = match imsi {
        Some((_, imsi)) if !imsi.is_empty() => imsi,
        _ => {
            state.logger.send_to_log("HTTP 400: Missing IMSI parameter");
            return (StatusCode::BAD_REQUEST, "IMSI parameter is missing");
        }
    };

    state
        .logger
        .send_to_log(format!("HTTP request /check_subscriber for IMSI: {imsi}"));

    let status = if state.manager.is_active(&imsi).await {
        "active"
    } else {
        "not active"
    };
    state
        .logger
        .send_to_log(format!("HTTP 200: Subscriber {imsi} status: {status}"));
    (StatusCode::OK, status)
}

async fn stop(State(state): State<AppState>) -> (StatusCode, &'static str) {
    state.logger.send_to_log("HTTP: Received shutdown command");
    tracing::info!("shutdown requested over HTTP");

    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(STOP_DELAY).await;
        let _ = shutdown.send(());
    });

    (StatusCode::OK, "Server is shutting down...")
}

/// HTTP front end bound to a TCP listener.
pub struct HttpFrontend {
    listener: TcpListener,
    router: Router,
}

impl HttpFrontend {
    pub async fn bind(
        addr: SocketAddr,
        manager: Arc<dyn SessionManager>,
        logger: AsyncLogger,
        shutdown: broadcast::Sender<()>,
    ) -> Result<Self, GatewayError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;
        logger.send_to_log(format!("HTTP server starting on: {addr}"));
        Ok(Self {
            listener,
            router: router(manager, logger, shutdown),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, GatewayError> {
        self.listener.local_addr().map_err(GatewayError::Io)
    }

    /// Serve until `shutdown` fires, then finish in-flight requests.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), GatewayError> {
        tracing::info!(addr = ?self.listener.local_addr().ok(), "HTTP front end listening");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(GatewayError::Io)?;
        tracing::info!("HTTP front end stopped");
        Ok(())
    }
}
