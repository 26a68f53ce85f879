//! serial-ws-bridge library crate.
//!
//! Reads single bytes from a serial device and fans each one out, in order, to
//! every connected WebSocket client as a bare JSON integer.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! serial device
//!         ↓  serial_core::SerialSource (blocking thread)
//! [serial-ws-bridge]
//!   ├── domain/           Pure types: BridgeConfig, ClientId
//!   ├── application/      ClientRegistry (lock-guarded fan-out), Broadcaster
//!   └── infrastructure/
//!         ├── config_file/    TOML config loading
//!         ├── client_channel/ Per-client bounded queue (the registry's sink)
//!         ├── ws_server/      Accept loop + per-client session tasks
//!         └── supervisor/     Starts the serial loop and the server together
//!         ↓
//! WebSocket clients (JSON integers, one per text frame)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `serial-core` only; no sockets.
//! - `infrastructure` depends on all other layers plus `tokio` and `tungstenite`.

/// Domain layer: configuration and client identity.
pub mod domain;

/// Application layer: client registry and broadcaster.
pub mod application;

/// Infrastructure layer: config file, WebSocket server, supervisor.
pub mod infrastructure;
