use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Settings for the session core. Field names follow the server's
/// configuration file keys.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Idle seconds after which a session is swept.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_sec: u64,
    /// Milliseconds to wait between removals during graceful shutdown.
    #[serde(default = "default_graceful_shutdown_rate")]
    pub graceful_shutdown_rate: u64,
    /// CDR (audit) file path.
    #[serde(default = "default_cdr_file")]
    pub cdr_file: PathBuf,
    #[serde(default)]
    pub blacklist: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            session_timeout_sec: default_session_timeout(),
            graceful_shutdown_rate: default_graceful_shutdown_rate(),
            cdr_file: default_cdr_file(),
            blacklist: Vec::new(),
        }
    }
}

impl CoreConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_sec)
    }

    pub fn shutdown_pace(&self) -> Duration {
        Duration::from_millis(self.graceful_shutdown_rate)
    }
}

fn default_session_timeout() -> u64 {
    30
}

fn default_graceful_shutdown_rate() -> u64 {
    10
}

fn default_cdr_file() -> PathBuf {
    PathBuf::from("cdr.log")
}
