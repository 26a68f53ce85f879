//! Infrastructure layer for serial-ws-bridge.
//!
//! The infrastructure layer handles all I/O: reading the config file,
//! accepting WebSocket connections, and running the serial loop next to the
//! server.
//!
//! # Responsibilities
//!
//! - Loading the optional TOML config file
//! - Binding a TCP listener and performing the WebSocket upgrade
//! - One Tokio task per client: writer (queue → text frames) and disconnect
//!   detection (discarding inbound frames)
//! - Running `SerialSource` on a blocking thread
//! - Handling the stop flag
//!
//! # What does NOT belong here?
//!
//! - Fan-out and membership rules (that is the application layer)
//! - Reconnect logic for the serial device (that is `serial-core`)

pub mod client_channel;
pub mod config_file;
pub mod supervisor;
pub mod ws_server;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use client_channel::{client_channel, ChannelSink, SharedRegistry};
pub use supervisor::{run_bridge, run_bridge_on};
pub use ws_server::{bind_listener, serve};
