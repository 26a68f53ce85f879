//! The [`Reading`] value type.
//!
//! A reading is exactly one byte received from the serial device.  There is no
//! framing, checksum, or escaping: the byte value itself is the message.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One byte-valued sample from the serial device, in the range `0..=255`.
///
/// Readings are ephemeral: they are handed to the broadcaster by value and
/// never stored after the fan-out completes.
///
/// Serialises as a bare JSON integer (`42`), not as an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reading(u8);

impl Reading {
    /// Wraps a raw byte.
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Returns the numeric value of the reading.
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl From<u8> for Reading {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<Reading> for u8 {
    fn from(reading: Reading) -> Self {
        reading.0
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
