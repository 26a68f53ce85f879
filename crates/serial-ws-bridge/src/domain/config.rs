//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is assembled in `main.rs` from three layers (defaults, optional TOML
//! file, CLI/environment) and then handed to the supervisor by value.

use std::net::{Ipv4Addr, SocketAddr};

use serial_core::SerialSettings;

/// Default WebSocket listen port.
pub const DEFAULT_WS_PORT: u16 = 3000;

/// Default depth of each client's outbound reading queue.
pub const DEFAULT_CLIENT_QUEUE: usize = 256;

/// All runtime configuration for the bridge.
///
/// # Example
///
/// ```rust
/// use serial_ws_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.ws_bind_addr.port(), 3000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// The address and port the WebSocket server binds to.
    pub ws_bind_addr: SocketAddr,

    /// How many readings may wait in one client's outbound queue.
    ///
    /// A client whose queue is full is treated as a failed send and dropped.
    pub client_queue: usize,

    /// Serial device and reconnect timing.
    pub serial: SerialSettings,
}

impl Default for BridgeConfig {
    /// | Field         | Default                    |
    /// |---------------|----------------------------|
    /// | ws_bind_addr  | `0.0.0.0:3000`             |
    /// | client_queue  | 256                        |
    /// | serial        | [`SerialSettings::default`] |
    fn default() -> Self {
        Self {
            ws_bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_WS_PORT)),
            client_queue: DEFAULT_CLIENT_QUEUE,
            serial: SerialSettings::default(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
