//! Per-client outbound queue.
//!
//! Each WebSocket session owns the receiving end of a bounded tokio channel
//! and drains it in its writer loop.  The sending end is registered with the
//! [`ClientRegistry`] as the client's [`ClientSink`].  Sending is a
//! non-blocking `try_send`, so the serial thread can fan out while holding the
//! registry lock without ever waiting on a socket.

use std::sync::Arc;

use serial_core::Reading;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::application::{ClientRegistry, ClientSink, SendError};

/// The registry type used by the running bridge.
pub type SharedRegistry = Arc<ClientRegistry<ChannelSink>>;

/// Registry-side handle of one client's queue.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Reading>,
}

/// Creates a client queue holding up to `capacity` readings (at least one).
pub fn client_channel(capacity: usize) -> (ChannelSink, mpsc::Receiver<Reading>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelSink { tx }, rx)
}

impl ClientSink for ChannelSink {
    fn send(&self, reading: Reading) -> Result<(), SendError> {
        self.tx.try_send(reading).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Lagging,
            TrySendError::Closed(_) => SendError::Disconnected,
        })
    }
}
