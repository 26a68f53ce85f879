//! The self-healing serial read loop.
//!
//! [`SerialSource`] keeps a serial connection open and emits one [`Reading`]
//! per received byte to a [`ReadingSink`].  It recovers from every device
//! failure on its own:
//!
//! ```text
//!            open ok                     read error / inactivity
//! Closed ──► Opening ──────────► Open ─────────────────────────► Closed
//!   ▲          │ open failed                                       │
//!   │          ▼                                                   │
//!   └──── wait retry_delay                    wait reopen_delay ◄──┘
//! ```
//!
//! - Open failures are retried forever, `retry_delay` apart.
//! - A read that times out without data is not an error.
//! - After every read attempt the time since the last successful byte is
//!   compared with `inactivity_threshold`; if it is exceeded the link is
//!   closed even though no error occurred (device powered off silently).
//!
//! The link and the last-activity timestamp are owned by the loop; nothing
//! else touches them, so no locking is needed here.
//!
//! # Threading
//!
//! `run` blocks.  The bridge runs it on a dedicated blocking thread.  The
//! `running` flag is checked once per read attempt and during waits, so the
//! loop stops within roughly one read timeout after the flag is cleared.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::domain::reading::Reading;
use crate::domain::settings::SerialSettings;
use crate::serial::{SerialError, SerialLink, SerialOpener};

/// Longest single sleep while waiting, so a cleared `running` flag is noticed
/// promptly even with a long retry delay.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Receives every reading the source produces, in order.
///
/// `publish` is called synchronously from the read loop: the next byte is not
/// read until it returns.
pub trait ReadingSink: Send + Sync {
    fn publish(&self, reading: Reading);
}

/// Why an open link was closed.
#[derive(Debug)]
pub enum CloseReason {
    /// The device reported an I/O error.
    ReadFailed(SerialError),
    /// No byte arrived for longer than the inactivity threshold.
    Inactive { idle: Duration },
    /// The `running` flag was cleared.
    Stopped,
}

/// Counters describing what the loop has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub open_attempts: u64,
    pub open_failures: u64,
    pub opens: u64,
    pub readings: u64,
    pub read_failures: u64,
    pub inactivity_resets: u64,
}

/// Loop state.  `Open` carries the link and the last-activity timestamp so
/// they cannot exist without each other.
enum State<L> {
    Closed { wait: Duration },
    Open { link: L, last_activity: Instant },
}

/// Owns the serial device and turns it into a stream of readings.
pub struct SerialSource<O: SerialOpener> {
    opener: O,
    settings: SerialSettings,
    stats: SourceStats,
}

impl<O: SerialOpener> SerialSource<O> {
    pub fn new(opener: O, settings: SerialSettings) -> Self {
        Self {
            opener,
            settings,
            stats: SourceStats::default(),
        }
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    pub fn stats(&self) -> SourceStats {
        self.stats
    }

    /// Runs the open/read/reconnect loop until `running` is cleared.
    ///
    /// Never returns while `running` stays `true`.
    pub fn run(&mut self, sink: &dyn ReadingSink, running: &AtomicBool) {
        info!(
            "serial source starting on {} ({} baud)",
            self.settings.port, self.settings.baud_rate
        );

        let mut state: State<O::Link> = State::Closed {
            wait: Duration::ZERO,
        };

        while running.load(Ordering::Relaxed) {
            state = match state {
                State::Closed { wait } => {
                    if !pause(wait, running) {
                        break;
                    }
                    self.try_open()
                }
                State::Open {
                    link,
                    last_activity,
                } => match self.pump(link, last_activity, sink, running) {
                    CloseReason::Stopped => break,
                    reason => self.closed_after(reason),
                },
            };
        }

        info!("serial source stopped");
    }

    /// One `Opening` step.
    fn try_open(&mut self) -> State<O::Link> {
        self.stats.open_attempts += 1;
        match self.opener.open(&self.settings) {
            Ok(link) => {
                self.stats.opens += 1;
                info!("serial connection established on {}", self.settings.port);
                State::Open {
                    link,
                    last_activity: Instant::now(),
                }
            }
            Err(e) => {
                self.stats.open_failures += 1;
                warn!(
                    "{e}; retrying in {:?} (attempt {})",
                    self.settings.retry_delay, self.stats.open_attempts
                );
                State::Closed {
                    wait: self.settings.retry_delay,
                }
            }
        }
    }

    /// Reads until the link has to be closed.  The link is dropped (closed)
    /// when this returns.
    fn pump(
        &mut self,
        mut link: O::Link,
        mut last_activity: Instant,
        sink: &dyn ReadingSink,
        running: &AtomicBool,
    ) -> CloseReason {
        while running.load(Ordering::Relaxed) {
            match link.read_byte() {
                Ok(Some(byte)) => {
                    let reading = Reading::new(byte);
                    debug!("serial reading: {reading}");
                    sink.publish(reading);
                    self.stats.readings += 1;
                    last_activity = Instant::now();
                }
                Ok(None) => {}
                Err(e) => return CloseReason::ReadFailed(e),
            }

            let idle = last_activity.elapsed();
            if idle > self.settings.inactivity_threshold {
                return CloseReason::Inactive { idle };
            }
        }
        CloseReason::Stopped
    }

    fn closed_after(&mut self, reason: CloseReason) -> State<O::Link> {
        match reason {
            CloseReason::ReadFailed(e) => {
                self.stats.read_failures += 1;
                warn!("{e}; closing {} and reopening", self.settings.port);
            }
            CloseReason::Inactive { idle } => {
                self.stats.inactivity_resets += 1;
                warn!(
                    "no data from {} for {idle:?}; closing and reopening",
                    self.settings.port
                );
            }
            CloseReason::Stopped => {}
        }
        State::Closed {
            wait: self.settings.reopen_delay,
        }
    }
}

/// Sleeps for `duration` in short slices.  Returns `false` if `running` was
/// cleared before the time was up.
fn pause(duration: Duration, running: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if !running.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(WAIT_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::mock::{MockDeviceHandle, MockSerialOpener};
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::thread::{self, JoinHandle};

    #[derive(Default)]
    struct RecordingSink {
        readings: Mutex<Vec<u8>>,
    }

    impl RecordingSink {
        fn values(&self) -> Vec<u8> {
            self.readings.lock().unwrap().clone()
        }
    }

    impl ReadingSink for RecordingSink {
        fn publish(&self, reading: Reading) {
            self.readings.lock().unwrap().push(reading.value());
        }
    }

    struct Harness {
        device: MockDeviceHandle,
        sink: Arc<RecordingSink>,
        running: Arc<AtomicBool>,
        thread: JoinHandle<SerialSource<MockSerialOpener>>,
    }

    impl Harness {
        fn start(settings: SerialSettings, prepare: impl FnOnce(&MockDeviceHandle)) -> Self {
            let (opener, device) = MockSerialOpener::new();
            prepare(&device);
            let sink = Arc::new(RecordingSink::default());
            let running = Arc::new(AtomicBool::new(true));

            let mut source = SerialSource::new(opener, settings);
            let sink_thread = Arc::clone(&sink);
            let running_thread = Arc::clone(&running);
            let thread = thread::spawn(move || {
                source.run(sink_thread.as_ref(), &running_thread);
                source
            });

            Self {
                device,
                sink,
                running,
                thread,
            }
        }

        fn stop(self) -> (SourceStats, MockDeviceHandle, Vec<u8>) {
            self.running.store(false, Ordering::Relaxed);
            let source = self.thread.join().expect("source thread panicked");
            (source.stats(), self.device, self.sink.values())
        }
    }

    fn fast_settings() -> SerialSettings {
        SerialSettings {
            port: "mock0".to_string(),
            baud_rate: 9600,
            read_timeout: Duration::from_millis(10),
            retry_delay: Duration::from_millis(1),
            inactivity_threshold: Duration::from_secs(5),
            reopen_delay: Duration::ZERO,
        }
    }

    fn wait_until(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_bytes_are_published_in_order() {
        // Arrange
        let h = Harness::start(fast_settings(), |_| {});

        // Act
        h.device.push_bytes(&[5, 200, 0]);
        assert!(wait_until(|| h.sink.values().len() == 3));

        // Assert
        let (stats, device, values) = h.stop();
        assert_eq!(values, vec![5, 200, 0]);
        assert_eq!(stats.readings, 3);
        assert_eq!(device.opens(), 1);
    }

    #[test]
    fn test_open_failures_are_retried_without_limit() {
        // Arrange: 25 consecutive failures before the device appears.
        let h = Harness::start(fast_settings(), |d| d.fail_next_opens(25));

        // Act
        assert!(wait_until(|| h.device.opens() == 1));

        // Assert: the 26th attempt still happened and succeeded.
        let (stats, device, _) = h.stop();
        assert_eq!(stats.open_failures, 25);
        assert_eq!(stats.open_attempts, 26);
        assert_eq!(device.open_attempts(), 26);
    }

    #[test]
    fn test_read_failure_closes_reopens_and_resumes() {
        // Arrange
        let h = Harness::start(fast_settings(), |_| {});

        // Act
        h.device.push_byte(1);
        h.device.push_read_error(io::ErrorKind::BrokenPipe);
        h.device.push_byte(2);
        assert!(wait_until(|| h.sink.values().len() == 2));

        // Assert
        let (stats, device, values) = h.stop();
        assert_eq!(values, vec![1, 2]);
        assert_eq!(stats.read_failures, 1);
        assert_eq!(stats.inactivity_resets, 0);
        assert_eq!(device.opens(), 2);
        assert!(device.closes() >= 1);
    }

    #[test]
    fn test_timeouts_alone_are_not_read_failures() {
        let h = Harness::start(fast_settings(), |_| {});

        // Several read timeouts elapse with no data.
        thread::sleep(Duration::from_millis(100));

        let (stats, device, values) = h.stop();
        assert!(values.is_empty());
        assert_eq!(stats.read_failures, 0);
        assert_eq!(device.opens(), 1);
    }

    #[test]
    fn test_inactivity_forces_reconnect_without_read_error() {
        // Arrange: threshold spans a few read timeouts, device stays silent.
        let settings = SerialSettings {
            inactivity_threshold: Duration::from_millis(40),
            ..fast_settings()
        };
        let h = Harness::start(settings, |_| {});

        // Act
        assert!(wait_until(|| h.device.opens() >= 2));

        // Assert
        let (stats, device, _) = h.stop();
        assert!(stats.inactivity_resets >= 1);
        assert_eq!(stats.read_failures, 0);
        assert!(device.closes() >= 1);
    }

    #[test]
    fn test_steady_data_keeps_connection_open() {
        // Arrange
        let settings = SerialSettings {
            inactivity_threshold: Duration::from_millis(300),
            ..fast_settings()
        };
        let h = Harness::start(settings, |_| {});

        // Act: a byte every 20 ms, well inside the threshold.
        for b in 0..10u8 {
            h.device.push_byte(b);
            thread::sleep(Duration::from_millis(20));
        }
        assert!(wait_until(|| h.sink.values().len() == 10));

        // Assert
        let (stats, device, values) = h.stop();
        assert_eq!(values, (0..10).collect::<Vec<u8>>());
        assert_eq!(stats.inactivity_resets, 0);
        assert_eq!(device.opens(), 1);
    }

    #[test]
    fn test_reopen_delay_is_applied_after_read_failure() {
        // Arrange
        let settings = SerialSettings {
            reopen_delay: Duration::from_millis(300),
            ..fast_settings()
        };
        let h = Harness::start(settings, |_| {});

        // Act
        h.device.push_read_error(io::ErrorKind::BrokenPipe);
        assert!(wait_until(|| h.device.closes() == 1));
        thread::sleep(Duration::from_millis(50));

        // Assert: still waiting, then reopens.
        assert_eq!(h.device.opens(), 1);
        assert!(wait_until(|| h.device.opens() == 2));
        h.stop();
    }

    #[test]
    fn test_cleared_flag_interrupts_retry_wait() {
        // Arrange: device absent and a long retry delay.
        let settings = SerialSettings {
            retry_delay: Duration::from_secs(30),
            ..fast_settings()
        };
        let h = Harness::start(settings, |d| d.fail_next_opens(u32::MAX));
        assert!(wait_until(|| h.device.open_attempts() >= 1));

        // Act
        let started = Instant::now();
        let (stats, _, _) = h.stop();

        // Assert
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(stats.opens, 0);
    }

    #[test]
    fn test_pause_returns_false_when_not_running() {
        let running = AtomicBool::new(false);
        assert!(!pause(Duration::from_secs(10), &running));
    }

    #[test]
    fn test_pause_zero_duration_returns_immediately() {
        let running = AtomicBool::new(true);
        assert!(pause(Duration::ZERO, &running));
    }
}
