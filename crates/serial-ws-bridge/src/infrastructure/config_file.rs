//! TOML configuration file for the bridge.
//!
//! The file is optional.  Every key has a default, so a file only needs the
//! settings that differ from them:
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 3000
//! client_queue = 256
//!
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//! read_timeout_ms = 100
//! retry_delay_ms = 1000
//! inactivity_ms = 3000
//! reopen_delay_ms = 0
//! ```
//!
//! Durations are whole milliseconds.  CLI flags and environment variables
//! override file values (see `main.rs`).

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serial_core::domain::settings::{
    DEFAULT_BAUD_RATE, DEFAULT_INACTIVITY_THRESHOLD, DEFAULT_PORT, DEFAULT_READ_TIMEOUT,
    DEFAULT_REOPEN_DELAY, DEFAULT_RETRY_DELAY,
};
use serial_core::SerialSettings;
use thiserror::Error;

use crate::domain::config::{BridgeConfig, DEFAULT_CLIENT_QUEUE, DEFAULT_WS_PORT};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `server.bind_address` is not an IP address.
    #[error("invalid bind address: '{0}'")]
    InvalidAddress(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub serial: SerialSection,
}

/// WebSocket listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSection {
    /// IP address to bind.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_ws_port")]
    pub port: u16,
    /// Per-client outbound queue depth.
    #[serde(default = "default_client_queue")]
    pub client_queue: usize,
}

/// Serial device and reconnect timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerialSection {
    #[serde(default = "default_serial_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_inactivity_ms")]
    pub inactivity_ms: u64,
    #[serde(default = "default_reopen_delay_ms")]
    pub reopen_delay_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_ws_port() -> u16 {
    DEFAULT_WS_PORT
}
fn default_client_queue() -> usize {
    DEFAULT_CLIENT_QUEUE
}
fn default_serial_port() -> String {
    DEFAULT_PORT.to_string()
}
fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}
fn default_read_timeout_ms() -> u64 {
    millis(DEFAULT_READ_TIMEOUT)
}
fn default_retry_delay_ms() -> u64 {
    millis(DEFAULT_RETRY_DELAY)
}
fn default_inactivity_ms() -> u64 {
    millis(DEFAULT_INACTIVITY_THRESHOLD)
}
fn default_reopen_delay_ms() -> u64 {
    millis(DEFAULT_REOPEN_DELAY)
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_ws_port(),
            client_queue: default_client_queue(),
        }
    }
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            inactivity_ms: default_inactivity_ms(),
            reopen_delay_ms: default_reopen_delay_ms(),
        }
    }
}

// ── Loading and conversion ────────────────────────────────────────────────────

/// Parses TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed or a value has the
/// wrong type.
pub fn parse_config(content: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Reads and parses the file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (including when it
/// does not exist: a path given explicitly must exist) and
/// [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

impl FileConfig {
    /// Converts the file schema into the runtime [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `server.bind_address` is not
    /// an IP address.
    pub fn into_bridge_config(self) -> Result<BridgeConfig, ConfigError> {
        let ip: IpAddr = self
            .server
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.server.bind_address.clone()))?;

        Ok(BridgeConfig {
            ws_bind_addr: SocketAddr::new(ip, self.server.port),
            client_queue: self.server.client_queue.max(1),
            serial: SerialSettings {
                port: self.serial.port,
                baud_rate: self.serial.baud_rate,
                read_timeout: Duration::from_millis(self.serial.read_timeout_ms),
                retry_delay: Duration::from_millis(self.serial.retry_delay_ms),
                inactivity_threshold: Duration::from_millis(self.serial.inactivity_ms),
                reopen_delay: Duration::from_millis(self.serial.reopen_delay_ms),
            },
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_config_matches_bridge_defaults() {
        // Arrange / Act
        let cfg = FileConfig::default().into_bridge_config().unwrap();

        // Assert
        assert_eq!(cfg, BridgeConfig::default());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg, FileConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        // Arrange
        let toml = r#"
            [serial]
            port = "COM3"
            inactivity_ms = 5000
        "#;

        // Act
        let cfg = parse_config(toml).unwrap().into_bridge_config().unwrap();

        // Assert
        assert_eq!(cfg.serial.port, "COM3");
        assert_eq!(cfg.serial.inactivity_threshold, Duration::from_secs(5));
        assert_eq!(cfg.serial.baud_rate, 9600);
        assert_eq!(cfg.ws_bind_addr.port(), 3000);
    }

    #[test]
    fn test_full_file_is_applied() {
        let toml = r#"
            [server]
            bind_address = "127.0.0.1"
            port = 8080
            client_queue = 16

            [serial]
            port = "/dev/ttyACM0"
            baud_rate = 115200
            read_timeout_ms = 50
            retry_delay_ms = 2000
            inactivity_ms = 1000
            reopen_delay_ms = 250
        "#;

        let cfg = parse_config(toml).unwrap().into_bridge_config().unwrap();

        assert_eq!(cfg.ws_bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(cfg.client_queue, 16);
        assert_eq!(cfg.serial.port, "/dev/ttyACM0");
        assert_eq!(cfg.serial.baud_rate, 115200);
        assert_eq!(cfg.serial.read_timeout, Duration::from_millis(50));
        assert_eq!(cfg.serial.retry_delay, Duration::from_secs(2));
        assert_eq!(cfg.serial.inactivity_threshold, Duration::from_secs(1));
        assert_eq!(cfg.serial.reopen_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_bind_address_returns_error() {
        let toml = "[server]\nbind_address = \"not.an.ip\"\n";
        let result = parse_config(toml).unwrap().into_bridge_config();
        assert!(matches!(result, Err(ConfigError::InvalidAddress(a)) if a == "not.an.ip"));
    }

    #[test]
    fn test_wrong_value_type_returns_parse_error() {
        let result = parse_config("[server]\nport = \"three thousand\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_client_queue_is_clamped() {
        let toml = "[server]\nclient_queue = 0\n";
        let cfg = parse_config(toml).unwrap().into_bridge_config().unwrap();
        assert_eq!(cfg.client_queue, 1);
    }

    #[test]
    fn test_missing_file_returns_io_error() {
        let path = std::env::temp_dir().join("serial-ws-bridge-no-such-config.toml");
        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_config_reads_file() {
        // Arrange
        let path = std::env::temp_dir().join(format!(
            "serial-ws-bridge-test-{}.toml",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, "[server]\nport = 4000\n").unwrap();

        // Act
        let result = load_config(&path);
        let _ = std::fs::remove_file(&path);

        // Assert
        assert_eq!(result.unwrap().server.port, 4000);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut cfg = FileConfig::default();
        cfg.server.port = 9000;
        cfg.serial.baud_rate = 57600;

        let text = toml::to_string_pretty(&cfg).expect("serialize");
        let restored = parse_config(&text).unwrap();

        assert_eq!(cfg, restored);
    }
}
