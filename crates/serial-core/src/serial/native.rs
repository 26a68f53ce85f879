//! Serial driver backed by the `serialport` crate.

use std::io::{self, Read};

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use super::{SerialError, SerialLink, SerialOpener};
use crate::domain::settings::SerialSettings;

/// Opens real serial devices (8N1, no flow control).
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeSerialOpener;

impl NativeSerialOpener {
    pub fn new() -> Self {
        Self
    }
}

impl SerialOpener for NativeSerialOpener {
    type Link = NativeSerialLink;

    fn open(&mut self, settings: &SerialSettings) -> Result<NativeSerialLink, SerialError> {
        let port = serialport::new(settings.port.as_str(), settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|e| SerialError::Open {
                port: settings.port.clone(),
                source: io::Error::from(e),
            })?;

        info!(
            "opened serial port {} at {} baud",
            settings.port, settings.baud_rate
        );

        Ok(NativeSerialLink {
            name: settings.port.clone(),
            port,
        })
    }
}

/// An open `serialport` device.  Dropping it closes the port.
pub struct NativeSerialLink {
    name: String,
    port: Box<dyn SerialPort>,
}

impl SerialLink for NativeSerialLink {
    fn read_byte(&mut self) -> Result<Option<u8>, SerialError> {
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if is_timeout(&e) => Ok(None),
            Err(e) => Err(SerialError::Read(e)),
        }
    }
}

impl Drop for NativeSerialLink {
    fn drop(&mut self) {
        debug!("closing serial port {}", self.name);
    }
}

/// Timeouts surface as `TimedOut` on Unix and occasionally `WouldBlock` on
/// Windows; neither means the device failed.
fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
