//! Serial device abstraction.
//!
//! The read loop only needs three primitives from a serial driver: open with a
//! fixed configuration, read at most one byte within a timeout, and close.
//! [`SerialOpener`] and [`SerialLink`] capture exactly those so the state
//! machine in [`crate::source`] can be tested without hardware.
//!
//! Closing is modelled as dropping the link.
//!
//! # Implementations
//!
//! - [`native::NativeSerialOpener`] – real device via the `serialport` crate.
//! - [`mock::MockSerialOpener`] – scripted device driven from tests.

use std::io;

use thiserror::Error;

use crate::domain::settings::SerialSettings;

pub mod mock;
pub mod native;

/// Error type for serial device operations.
#[derive(Debug, Error)]
pub enum SerialError {
    /// The device could not be opened (absent, busy, permission denied).
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: io::Error,
    },

    /// An explicit I/O error while reading.  A timeout is not an error.
    #[error("serial read failed: {0}")]
    Read(#[source] io::Error),
}

/// An open serial connection.
pub trait SerialLink: Send {
    /// Reads at most one byte, blocking for no longer than the read timeout the
    /// link was opened with.
    ///
    /// Returns `Ok(None)` when the timeout elapsed with no data.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::Read`] for device errors; the caller must then
    /// drop the link.
    fn read_byte(&mut self) -> Result<Option<u8>, SerialError>;
}

/// Opens [`SerialLink`]s for a fixed device configuration.
pub trait SerialOpener: Send {
    type Link: SerialLink;

    /// Opens the device described by `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::Open`] if the device cannot be opened.
    fn open(&mut self, settings: &SerialSettings) -> Result<Self::Link, SerialError>;
}
