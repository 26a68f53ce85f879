//! Scripted serial device for unit and integration testing.
//!
//! [`MockSerialOpener::new`] returns the opener together with a
//! [`MockDeviceHandle`].  Tests use the handle to feed bytes and read errors
//! into whichever link is currently open, to make the next N opens fail, and
//! to observe how many times the device was opened and closed.
//!
//! Reads block for up to the configured read timeout, like a real port, so
//! inactivity handling runs against real elapsed time.

use std::io;
use std::sync::{
    mpsc::{self, Receiver, RecvTimeoutError, Sender},
    Arc, Mutex, MutexGuard, PoisonError,
};
use std::time::Duration;

use super::{SerialError, SerialLink, SerialOpener};
use crate::domain::settings::SerialSettings;

/// One scripted event delivered to a read call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The device produced this byte.
    Byte(u8),
    /// The read fails with an I/O error of this kind.
    Fail(io::ErrorKind),
}

#[derive(Debug, Default)]
struct DeviceCounters {
    pending_open_failures: u32,
    open_attempts: u32,
    opens: u32,
    closes: u32,
}

/// Shared between the opener, every link it hands out, and the handle.
#[derive(Debug)]
struct DeviceShared {
    counters: Mutex<DeviceCounters>,
    events: Mutex<Receiver<LinkEvent>>,
}

impl DeviceShared {
    fn counters(&self) -> MutexGuard<'_, DeviceCounters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Test-side control of a [`MockSerialOpener`].
#[derive(Debug, Clone)]
pub struct MockDeviceHandle {
    tx: Sender<LinkEvent>,
    shared: Arc<DeviceShared>,
}

impl MockDeviceHandle {
    /// Queues one byte for the next read.
    pub fn push_byte(&self, byte: u8) {
        self.push(LinkEvent::Byte(byte));
    }

    /// Queues several bytes, delivered one per read in order.
    pub fn push_bytes(&self, bytes: &[u8]) {
        for &b in bytes {
            self.push_byte(b);
        }
    }

    /// Queues a read error.
    pub fn push_read_error(&self, kind: io::ErrorKind) {
        self.push(LinkEvent::Fail(kind));
    }

    fn push(&self, event: LinkEvent) {
        // The receiver lives in `shared`, which this handle keeps alive, so
        // the send cannot fail.
        let _ = self.tx.send(event);
    }

    /// Makes the next `n` open attempts fail with `NotFound`.
    pub fn fail_next_opens(&self, n: u32) {
        self.shared.counters().pending_open_failures += n;
    }

    /// Total calls to `open`, successful or not.
    pub fn open_attempts(&self) -> u32 {
        self.shared.counters().open_attempts
    }

    /// Successful opens.
    pub fn opens(&self) -> u32 {
        self.shared.counters().opens
    }

    /// Links dropped so far.
    pub fn closes(&self) -> u32 {
        self.shared.counters().closes
    }

    /// `true` while a link is open.
    pub fn is_open(&self) -> bool {
        let c = self.shared.counters();
        c.opens > c.closes
    }
}

/// A [`SerialOpener`] whose device is scripted through a [`MockDeviceHandle`].
#[derive(Debug)]
pub struct MockSerialOpener {
    shared: Arc<DeviceShared>,
}

impl MockSerialOpener {
    /// Creates a device that opens successfully and produces no data until
    /// the handle pushes some.
    pub fn new() -> (Self, MockDeviceHandle) {
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(DeviceShared {
            counters: Mutex::new(DeviceCounters::default()),
            events: Mutex::new(rx),
        });
        let opener = Self {
            shared: Arc::clone(&shared),
        };
        (opener, MockDeviceHandle { tx, shared })
    }
}

impl SerialOpener for MockSerialOpener {
    type Link = MockSerialLink;

    fn open(&mut self, settings: &SerialSettings) -> Result<MockSerialLink, SerialError> {
        let mut counters = self.shared.counters();
        counters.open_attempts += 1;

        if counters.pending_open_failures > 0 {
            counters.pending_open_failures -= 1;
            return Err(SerialError::Open {
                port: settings.port.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "mock device unplugged"),
            });
        }

        counters.opens += 1;
        Ok(MockSerialLink {
            shared: Arc::clone(&self.shared),
            read_timeout: settings.read_timeout,
        })
    }
}

/// An open mock link.  Dropping it counts as a close.
#[derive(Debug)]
pub struct MockSerialLink {
    shared: Arc<DeviceShared>,
    read_timeout: Duration,
}

impl SerialLink for MockSerialLink {
    fn read_byte(&mut self) -> Result<Option<u8>, SerialError> {
        let events = self
            .shared
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match events.recv_timeout(self.read_timeout) {
            Ok(LinkEvent::Byte(b)) => Ok(Some(b)),
            Ok(LinkEvent::Fail(kind)) => Err(SerialError::Read(io::Error::new(
                kind,
                "mock device read failure",
            ))),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            // Every handle is gone; behave like an idle port.
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(self.read_timeout);
                Ok(None)
            }
        }
    }
}

impl Drop for MockSerialLink {
    fn drop(&mut self) {
        self.shared.counters().closes += 1;
    }
}
