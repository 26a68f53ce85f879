//! Wire format for readings sent to network clients.
//!
//! Each WebSocket text frame carries exactly one reading encoded as a bare
//! JSON integer:
//!
//! ```text
//! 5
//! 200
//! 0
//! ```

pub mod wire;

pub use wire::{decode_reading, encode_reading, WireError};
