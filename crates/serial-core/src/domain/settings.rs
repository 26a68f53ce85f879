//! Serial device and reconnect timing settings.
//!
//! [`SerialSettings`] is a plain struct with no environment or file reads; the
//! bridge binary is responsible for populating it from its config layers.

use std::time::Duration;

/// Everything [`SerialSource`](crate::SerialSource) needs to open the device
/// and drive its reconnect state machine.
///
/// # Example
///
/// ```rust
/// use serial_core::SerialSettings;
///
/// let settings = SerialSettings::default();
/// assert_eq!(settings.baud_rate, 9600);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Device identifier, e.g. `/dev/ttyUSB0` or `COM7`.
    pub port: String,

    /// Line speed in bits per second.
    pub baud_rate: u32,

    /// Upper bound on a single one-byte read.
    ///
    /// A read that times out without data is not an error; it only gives the
    /// loop a chance to run the inactivity check.
    pub read_timeout: Duration,

    /// Wait between failed open attempts.  Retries are unbounded.
    pub retry_delay: Duration,

    /// Maximum time without a successful byte before the connection is
    /// force-closed and re-opened.
    pub inactivity_threshold: Duration,

    /// Wait before re-opening after a read failure or an inactivity reset.
    ///
    /// Zero re-opens immediately: the device was present a moment ago, so a
    /// fast retry is the common case.  Open failures always use
    /// [`retry_delay`](Self::retry_delay).
    pub reopen_delay: Duration,
}

/// Platform default device name.
#[cfg(target_os = "windows")]
pub const DEFAULT_PORT: &str = "COM7";
/// Platform default device name.
#[cfg(not(target_os = "windows"))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_INACTIVITY_THRESHOLD: Duration = Duration::from_secs(3);
pub const DEFAULT_REOPEN_DELAY: Duration = Duration::ZERO;

impl Default for SerialSettings {
    /// | Field                | Default                          |
    /// |----------------------|----------------------------------|
    /// | port                 | `/dev/ttyUSB0` (`COM7` on Windows) |
    /// | baud_rate            | 9600                             |
    /// | read_timeout         | 100 ms                           |
    /// | retry_delay          | 1 s                              |
    /// | inactivity_threshold | 3 s                              |
    /// | reopen_delay         | 0                                |
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            inactivity_threshold: DEFAULT_INACTIVITY_THRESHOLD,
            reopen_delay: DEFAULT_REOPEN_DELAY,
        }
    }
}
