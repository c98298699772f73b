//! Test client: sends one subscriber token to the server over UDP and prints
//! the status it answers with.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::net::UdpSocket;
use tracing::{info, warn};

use audit_log::AsyncLogger;

const DEFAULT_TOKEN: &str = "123456789012345";
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_REPLY: usize = 1024;

#[derive(Parser, Debug)]
#[command(name = "imsi-client", version, about = "Send one IMSI to subscriber-gate")]
struct Args {
    /// Subscriber token to send
    imsi: Option<String>,

    /// Path to the client configuration file
    #[arg(short, long, default_value = "client.yaml")]
    config: PathBuf,

    /// Diagnostic log file
    #[arg(long, default_value = "client.log")]
    log_file: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ClientConfig {
    #[serde(default = "default_server_ip")]
    server_ip: String,
    #[serde(default = "default_server_port")]
    server_port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_ip: default_server_ip(),
            server_port: default_server_port(),
        }
    }
}

fn default_server_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    9000
}

fn load_config(path: &Path) -> Result<ClientConfig> {
    if !path.exists() {
        warn!(path = %path.display(), "client config not found; using defaults");
        return Ok(ClientConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_yml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = load_config(&args.config)?;
    let imsi = match args.imsi {
        Some(imsi) => imsi,
        None => {
            warn!(imsi = DEFAULT_TOKEN, "no IMSI given; using default");
            DEFAULT_TOKEN.to_string()
        }
    };

    let logger = AsyncLogger::open(&args.log_file)
        .await
        .context("failed to open client log")?;
    logger.start();

    let result = exchange(&cfg, &imsi, &logger).await;
    if let Err(ref err) = result {
        logger.send_to_log(format!("Error: {err:#}"));
    }
    logger.stop().await;

    let reply = result?;
    println!("{reply}");
    Ok(())
}

async fn exchange(cfg: &ClientConfig, imsi: &str, logger: &AsyncLogger) -> Result<String> {
    let server = format!("{}:{}", cfg.server_ip, cfg.server_port);
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("failed to bind client socket")?;

    socket
        .send_to(imsi.as_bytes(), &server)
        .await
        .with_context(|| format!("failed to send to {server}"))?;
    logger.send_to_log(format!("Sent IMSI: {imsi} to {server}"));
    info!(%server, imsi, "request sent");

    let mut buf = [0u8; MAX_REPLY];
    let (len, _) = tokio::time::timeout(REPLY_TIMEOUT, socket.recv_from(&mut buf))
        .await
        .context("no reply from server")?
        .context("failed to receive reply")?;

    let reply = String::from_utf8_lossy(&buf[..len]).into_owned();
    logger.send_to_log(format!("Response from server: {reply}"));
    Ok(reply)
}
