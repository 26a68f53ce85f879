//! ClientRegistry: the set of connected clients and the fan-out broadcast.
//!
//! The registry is the only mutable state shared between tasks:
//!
//! - the accept path calls [`ClientRegistry::add`] after a successful
//!   WebSocket upgrade and [`ClientRegistry::remove`] when the client goes away;
//! - the serial thread calls [`ClientRegistry::broadcast`] for every reading,
//!   which also removes clients whose send fails.
//!
//! All three take the same `std::sync::Mutex`, so no operation ever observes
//! the map mid-mutation.  Sends are non-blocking enqueues (see
//! `infrastructure::client_channel`), so the lock is never held across I/O
//! or an `.await`.
//!
//! # Registration during a broadcast
//!
//! `broadcast` holds the lock for the whole fan-out.  An `add` that races with
//! it completes strictly after the in-flight broadcast: the new client does
//! not get that reading and gets every reading broadcast after `add` returns.
//!
//! # Ordering
//!
//! Readings are broadcast one at a time from the serial thread, so each
//! client's queue receives them in production order.  Order across clients
//! is unspecified (`HashMap` iteration).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serial_core::Reading;
use thiserror::Error;
use tracing::warn;

use crate::domain::ClientId;

/// Why a reading could not be handed to a client.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The client's connection is gone.
    #[error("client connection closed")]
    Disconnected,

    /// The client is not draining its queue fast enough.
    #[error("client queue is full")]
    Lagging,
}

/// Delivery endpoint for one client.
///
/// `send` must not block: it is called with the registry lock held.
#[cfg_attr(test, mockall::automock)]
pub trait ClientSink: Send {
    fn send(&self, reading: Reading) -> Result<(), SendError>;
}

/// Outcome of one [`ClientRegistry::broadcast`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Clients that accepted the reading.
    pub delivered: usize,
    /// Clients whose send failed and that were removed.
    pub dropped: usize,
}

/// Concurrency-safe set of connected clients.
pub struct ClientRegistry<S> {
    clients: Mutex<HashMap<ClientId, S>>,
}

impl<S> Default for ClientRegistry<S> {
    fn default() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }
}

impl<S: ClientSink> ClientRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A panicking sink cannot leave the map half-updated, so a poisoned
    /// lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<ClientId, S>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a client.  If `id` is already present the existing sink is
    /// kept and `sink` is dropped.
    pub fn add(&self, id: ClientId, sink: S) {
        self.lock().entry(id).or_insert(sink);
    }

    /// Unregisters a client.  Removing an absent client is a no-op.
    pub fn remove(&self, id: ClientId) {
        self.lock().remove(&id);
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Delivers `reading` to every registered client.
    ///
    /// A failed send never reaches the caller and never stops delivery to the
    /// remaining clients; the failing client is removed instead.
    pub fn broadcast(&self, reading: Reading) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        self.lock().retain(|id, sink| match sink.send(reading) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(e) => {
                warn!("client {id}: {e}; removing from registry");
                report.dropped += 1;
                false
            }
        });
        report
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
