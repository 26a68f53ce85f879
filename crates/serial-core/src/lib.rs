//! # serial-core
//!
//! Shared library for the serial-to-WebSocket bridge containing the reading
//! type, its JSON wire format, the serial device abstraction, and the
//! self-healing serial read loop.
//!
//! This crate has no dependency on sockets, WebSocket framing, or an async
//! runtime.  The bridge binary drives [`SerialSource`] on a blocking thread and
//! plugs its own fan-out into the [`ReadingSink`] seam.
//!
//! # Architecture overview
//!
//! ```text
//! serial device ──► serial::SerialLink ──► source::SerialSource ──► ReadingSink
//!                   (serialport / mock)    (Closed/Opening/Open)     (broadcaster)
//! ```
//!
//! - **`domain`** – Pure value types: [`Reading`] and [`SerialSettings`].
//! - **`protocol`** – How a reading looks on the wire (a bare JSON integer).
//! - **`serial`** – The [`SerialOpener`]/[`SerialLink`] traits, the native
//!   `serialport` driver, and a scripted mock device for tests.
//! - **`source`** – The reconnect/inactivity state machine.

pub mod domain;
pub mod protocol;
pub mod serial;
pub mod source;

// Re-export the most-used types at the crate root so callers can write
// `serial_core::Reading` instead of `serial_core::domain::reading::Reading`.
pub use domain::reading::Reading;
pub use domain::settings::SerialSettings;
pub use protocol::wire::{decode_reading, encode_reading, WireError};
pub use serial::{SerialError, SerialLink, SerialOpener};
pub use source::{CloseReason, ReadingSink, SerialSource, SourceStats};
