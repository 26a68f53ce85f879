//! Domain layer for serial-ws-bridge.
//!
//! Pure types with no dependency on sockets, files, or the async runtime.

pub mod client;
pub mod config;

pub use client::ClientId;
pub use config::BridgeConfig;
