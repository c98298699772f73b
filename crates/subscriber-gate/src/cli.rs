use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "subscriber-gate",
    version,
    about = "Subscriber admission and audit server"
)]
pub struct Cli {
    /// Path to the configuration file (YAML or JSON)
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Diagnostic log file (overrides config file setting)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// CDR audit file (overrides config file setting)
    #[arg(long)]
    pub cdr_file: Option<PathBuf>,

    /// UDP port (overrides config file setting)
    #[arg(long)]
    pub udp_port: Option<u16>,

    /// HTTP port (overrides config file setting)
    #[arg(long)]
    pub http_port: Option<u16>,
}
