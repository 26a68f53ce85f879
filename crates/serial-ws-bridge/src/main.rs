//! Serial-to-WebSocket bridge: entry point.
//!
//! Reads single bytes from a serial device (e.g. a Bluetooth serial module
//! feeding a sensor) and pushes each byte, as a JSON integer, to every
//! connected WebSocket client.
//!
//! # Usage
//!
//! ```text
//! serial-ws-bridge [OPTIONS]
//!
//! Options:
//!   --config          <PATH>  TOML config file
//!   --ws-bind         <IP>    WebSocket bind address [default: 0.0.0.0]
//!   --ws-port         <PORT>  WebSocket listener port [default: 3000]
//!   --client-queue    <N>     Per-client reading queue depth [default: 256]
//!   --serial-port     <NAME>  Serial device [default: /dev/ttyUSB0, COM7 on Windows]
//!   --baud-rate       <BPS>   Baud rate [default: 9600]
//!   --read-timeout-ms <MS>    Per-read timeout [default: 100]
//!   --retry-delay-ms  <MS>    Wait between failed opens [default: 1000]
//!   --inactivity-ms   <MS>    Silence before a forced reconnect [default: 3000]
//!   --reopen-delay-ms <MS>    Wait before reopening after a read failure [default: 0]
//! ```
//!
//! # Configuration precedence
//!
//! Built-in defaults, then the `--config` file, then environment variables
//! and CLI flags (CLI wins over env).
//!
//! | Variable                    | Overrides          |
//! |-----------------------------|--------------------|
//! | `SERIAL_WS_CONFIG`          | `--config`         |
//! | `SERIAL_WS_BIND`            | `--ws-bind`        |
//! | `SERIAL_WS_PORT`            | `--ws-port`        |
//! | `SERIAL_WS_CLIENT_QUEUE`    | `--client-queue`   |
//! | `SERIAL_WS_DEVICE`          | `--serial-port`    |
//! | `SERIAL_WS_BAUD`            | `--baud-rate`      |
//! | `SERIAL_WS_READ_TIMEOUT_MS` | `--read-timeout-ms`|
//! | `SERIAL_WS_RETRY_DELAY_MS`  | `--retry-delay-ms` |
//! | `SERIAL_WS_INACTIVITY_MS`   | `--inactivity-ms`  |
//! | `SERIAL_WS_REOPEN_DELAY_MS` | `--reopen-delay-ms`|

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use serial_core::serial::native::NativeSerialOpener;
use serial_ws_bridge::domain::BridgeConfig;
use serial_ws_bridge::infrastructure::config_file::{load_config, FileConfig};
use serial_ws_bridge::infrastructure::run_bridge;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Serial-to-WebSocket bridge.
///
/// Every flag is optional; unset flags fall back to the config file and then
/// to the built-in defaults.
#[derive(Debug, Parser)]
#[command(
    name = "serial-ws-bridge",
    about = "Fans out bytes read from a serial device to WebSocket clients",
    version
)]
struct Cli {
    /// TOML config file.  Must exist when given.
    #[arg(long, env = "SERIAL_WS_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the WebSocket server to.
    #[arg(long, env = "SERIAL_WS_BIND")]
    ws_bind: Option<String>,

    /// TCP port for the WebSocket server.
    #[arg(long, env = "SERIAL_WS_PORT")]
    ws_port: Option<u16>,

    /// Readings buffered per client before it is dropped as too slow.
    #[arg(long, env = "SERIAL_WS_CLIENT_QUEUE")]
    client_queue: Option<usize>,

    /// Serial device name, e.g. `/dev/ttyUSB0` or `COM7`.
    #[arg(long, env = "SERIAL_WS_DEVICE")]
    serial_port: Option<String>,

    /// Serial line speed.
    #[arg(long, env = "SERIAL_WS_BAUD")]
    baud_rate: Option<u32>,

    /// Upper bound on one single-byte read, in milliseconds.
    #[arg(long, env = "SERIAL_WS_READ_TIMEOUT_MS")]
    read_timeout_ms: Option<u64>,

    /// Wait between failed open attempts, in milliseconds.
    #[arg(long, env = "SERIAL_WS_RETRY_DELAY_MS")]
    retry_delay_ms: Option<u64>,

    /// Silence after which the port is closed and reopened, in milliseconds.
    #[arg(long, env = "SERIAL_WS_INACTIVITY_MS")]
    inactivity_ms: Option<u64>,

    /// Wait before reopening after a read failure, in milliseconds.
    #[arg(long, env = "SERIAL_WS_REOPEN_DELAY_MS")]
    reopen_delay_ms: Option<u64>,
}

impl Cli {
    /// Loads the config file (if any) and applies the CLI/env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if the
    /// resulting bind address is not an IP address.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        let mut file = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => FileConfig::default(),
        };

        if let Some(v) = self.ws_bind {
            file.server.bind_address = v;
        }
        if let Some(v) = self.ws_port {
            file.server.port = v;
        }
        if let Some(v) = self.client_queue {
            file.server.client_queue = v;
        }
        if let Some(v) = self.serial_port {
            file.serial.port = v;
        }
        if let Some(v) = self.baud_rate {
            file.serial.baud_rate = v;
        }
        if let Some(v) = self.read_timeout_ms {
            file.serial.read_timeout_ms = v;
        }
        if let Some(v) = self.retry_delay_ms {
            file.serial.retry_delay_ms = v;
        }
        if let Some(v) = self.inactivity_ms {
            file.serial.inactivity_ms = v;
        }
        if let Some(v) = self.reopen_delay_ms {
            file.serial.reopen_delay_ms = v;
        }

        Ok(file.into_bridge_config()?)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// 1. Logging via `tracing_subscriber`, level from `RUST_LOG` (default `info`).
/// 2. CLI/env/file configuration.
/// 3. A Ctrl+C handler clears the shared `running` flag.
/// 4. [`run_bridge`] binds the listener (fatal on failure) and runs the serial
///    loop and the accept loop until the flag is cleared.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_bridge_config()?;

    info!(
        "serial-ws-bridge starting: ws={}, serial={} @ {} baud",
        config.ws_bind_addr, config.serial.port, config.serial.baud_rate
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, stopping");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_bridge(config, NativeSerialOpener::new(), running).await?;

    info!("serial-ws-bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
