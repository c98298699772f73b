mod cli;
mod config;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use audit_log::AsyncLogger;
use gateway::{HttpFrontend, UdpFrontend};
use session_core::SessionCore;

use crate::cli::Cli;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args.
    let cli = Cli::parse();

    // 2. Load config, then merge CLI overrides.
    let mut cfg = config::load(&cli.config)?;

    if let Some(ref log_file) = cli.log_file {
        cfg.log_file = log_file.clone();
    }
    if let Some(ref cdr_file) = cli.cdr_file {
        cfg.core.cdr_file = cdr_file.clone();
    }
    if let Some(port) = cli.udp_port {
        cfg.udp_port = port;
    }
    if let Some(port) = cli.http_port {
        cfg.http_port = port;
    }

    // 3. Init tracing-subscriber with JSON format.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!(
        config_file = %cli.config.display(),
        log_file = %cfg.log_file.display(),
        cdr_file = %cfg.core.cdr_file.display(),
        udp_port = cfg.udp_port,
        http_port = cfg.http_port,
        "subscriber-gate starting"
    );

    // 4. Start the diagnostic logger. Without it there is nowhere to report
    //    anything else, so failing here is fatal.
    let logger = AsyncLogger::open(&cfg.log_file)
        .await
        .context("failed to open diagnostic log")?;
    logger.start();
    logger.send_to_log("Server starting");

    // 5. Run the server; the logger is drained whatever the outcome.
    let result = serve(&cfg, &logger).await;
    if let Err(ref err) = result {
        error!(error = %format!("{err:#}"), "subscriber-gate failed");
        logger.send_to_log(format!("Fatal: {err:#}"));
    }

    logger.stop().await;
    result
}

async fn serve(cfg: &Config, logger: &AsyncLogger) -> Result<()> {
    let core = SessionCore::new(&cfg.core, logger.clone())
        .await
        .context("failed to initialize session core")?;
    core.start_scheduler().await;

    // Shutdown is broadcast by a signal or by `GET /stop`.
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(4);
    spawn_signal_listener(shutdown_tx.clone());

    let udp_addr = SocketAddr::new(cfg.bind_addr, cfg.udp_port);
    let http_addr = SocketAddr::new(cfg.bind_addr, cfg.http_port);

    let udp = UdpFrontend::bind(udp_addr, core.manager(), logger.clone())
        .await
        .context("failed to start UDP front end")?;
    let http = HttpFrontend::bind(http_addr, core.manager(), logger.clone(), shutdown_tx.clone())
        .await
        .context("failed to start HTTP front end")?;

    info!(udp = %udp_addr, http = %http_addr, "front ends bound");

    let udp_task = tokio::spawn(udp.run(shutdown_tx.subscribe()));
    let http_task = {
        let rx = shutdown_tx.subscribe();
        let tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = http.run(rx).await {
                error!(%err, "HTTP front end failed");
                let _ = tx.send(());
            }
        })
    };

    let _ = shutdown_rx.recv().await;
    info!("subscriber-gate shutting down");

    if let Err(err) = udp_task.await {
        warn!(%err, "UDP front end task panicked");
    }
    if let Err(err) = http_task.await {
        warn!(%err, "HTTP front end task panicked");
    }

    let drained = core.shutdown().await;
    info!(drained, "sessions drained");
    logger.send_to_log("Server stopped gracefully");
    Ok(())
}

/// Broadcast shutdown on SIGINT (ctrl-c) or SIGTERM.
fn spawn_signal_listener(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (ctrl-c)"),
                        _ = sigterm.recv() => info!("received SIGTERM"),
                    }
                }
                Err(err) => {
                    warn!(%err, "failed to register SIGTERM handler; SIGINT only");
                    ctrl_c.await.ok();
                    info!("received SIGINT (ctrl-c)");
                }
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            info!("received SIGINT (ctrl-c)");
        }

        let _ = shutdown_tx.send(());
    });
}
