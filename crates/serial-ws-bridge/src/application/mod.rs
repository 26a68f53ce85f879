//! Application layer for serial-ws-bridge.
//!
//! Knows *what* happens to a reading (fan it out to every registered client,
//! drop clients that fail) without knowing *how* clients are connected.
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or performing the WebSocket upgrade (infrastructure)
//! - Tokio task spawning (infrastructure)
//! - Opening the serial device (`serial-core`)

pub mod broadcaster;
pub mod registry;

pub use broadcaster::Broadcaster;
pub use registry::{BroadcastReport, ClientRegistry, ClientSink, SendError};
