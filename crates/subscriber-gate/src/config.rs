use serde::Deserialize;
use session_core::CoreConfig;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: IpAddr,
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Session settings live at the top level of the file.
    #[serde(flatten)]
    pub core: CoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            udp_port: default_udp_port(),
            http_port: default_http_port(),
            log_file: default_log_file(),
            logging: LoggingConfig::default(),
            core: CoreConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default-value functions used by serde
// ---------------------------------------------------------------------------

fn default_bind_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_udp_port() -> u16 {
    9000
}

fn default_http_port() -> u16 {
    8080
}

fn default_log_file() -> PathBuf {
    PathBuf::from("server.log")
}

fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load configuration from a YAML (or JSON) file.
///
/// If the file does not exist a default configuration is returned and a
/// warning is emitted.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "configuration file not found; using defaults"
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

    parse(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))
}

fn parse(contents: &str) -> Result<Config, serde_yml::Error> {
    serde_yml::from_str(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_json_layout() {
        let json = r#"{
            "udp_port": 9100,
            "http_port": 8181,
            "session_timeout_sec": 5,
            "graceful_shutdown_rate": 100,
            "cdr_file": "cdr.log",
            "blacklist": ["123456789012345"]
        }"#;
        let cfg = parse(json).unwrap();
        assert_eq!(cfg.udp_port, 9100);
        assert_eq!(cfg.http_port, 8181);
        assert_eq!(cfg.core.session_timeout_sec, 5);
        assert_eq!(cfg.core.graceful_shutdown_rate, 100);
        assert_eq!(cfg.core.blacklist, vec!["123456789012345"]);
        assert_eq!(cfg.log_file, PathBuf::from("server.log"));
    }

    #[test]
    fn parses_yaml_with_logging_section() {
        let yaml = r#"
bind_addr: "127.0.0.1"
log_file: /var/log/subscriber-gate/server.log
logging:
  level: debug
session_timeout_sec: 10
"#;
        let cfg = parse(yaml).unwrap();
        assert_eq!(cfg.bind_addr, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.core.session_timeout_sec, 10);
        assert_eq!(cfg.udp_port, 9000);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load(Path::new("/does/not/exist.yaml")).unwrap();
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.core.session_timeout_sec, 30);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "udp_port: [not, a, port]\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(
            err.to_string().contains("failed to parse config file"),
            "unexpected error: {err}"
        );
    }
}
