//! WebSocket server: accept loop and per-client session tasks.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections.
//! 3. Upgrading each connection to a WebSocket session.  A failed upgrade
//!    only abandons that connection.
//! 4. Registering the client with the [`ClientRegistry`](crate::application::ClientRegistry)
//!    and, per client, running two loops in one Tokio task:
//!    - **Writer**: drains the client's reading queue and sends each reading
//!      as a JSON text frame.
//!    - **Reader**: receives and discards inbound frames; it exists only to
//!      notice when the client goes away.
//! 5. Removing the client when either loop ends.
//! 6. Stopping the accept loop when the `running` flag is cleared.
//!
//! Each client runs in its own Tokio task, so a slow client never blocks
//! accepting or serving the others.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use serial_core::encode_reading;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use crate::domain::ClientId;
use crate::infrastructure::client_channel::{client_channel, SharedRegistry};

/// How often the accept loop wakes up to check the `running` flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the WebSocket listener.
///
/// # Errors
///
/// Returns an error if the address cannot be bound (port in use, no
/// permission).  The bridge has no purpose without its listener, so callers
/// treat this as fatal.
pub async fn bind_listener(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {addr}"))?;
    info!("WebSocket server listening on {addr}");
    Ok(listener)
}

/// Runs the accept loop on `listener` until `running` is set to `false`.
///
/// Every accepted connection is handed to its own task.  Accept errors are
/// logged and the loop carries on.
pub async fn serve(
    listener: TcpListener,
    registry: SharedRegistry,
    client_queue: usize,
    running: Arc<AtomicBool>,
) {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout so the flag is checked even when nobody connects.
        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new TCP connection from {peer_addr}");
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    handle_client_session(stream, peer_addr, registry, client_queue).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. too many open file descriptors).
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }
}

// ── Per-client session ────────────────────────────────────────────────────────

/// Wraps [`run_session`] and logs the outcome.
async fn handle_client_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    registry: SharedRegistry,
    client_queue: usize,
) {
    if let Err(e) = run_session(raw_stream, peer_addr, registry, client_queue).await {
        warn!("session {peer_addr} ended with error: {e:#}");
    }
}

/// Upgrades, registers, and serves one client until it disconnects.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails (the client was never
/// registered) or if sending a frame fails (the client has been removed by
/// the time this returns).
async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    registry: SharedRegistry,
    client_queue: usize,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let id = ClientId::new();
    let (sink, mut readings) = client_channel(client_queue);
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    registry.add(id, sink);
    info!("client {id} connected from {peer_addr}");

    let writer = async {
        // Ends with `None` once the registry has dropped this client's sink.
        while let Some(reading) = readings.recv().await {
            let text = encode_reading(reading)?;
            ws_tx
                .send(WsMessage::Text(text))
                .await
                .with_context(|| format!("send to client {id} failed"))?;
        }
        debug!("client {id}: queue closed by registry");
        anyhow::Ok(())
    };

    let reader = async {
        loop {
            match ws_rx.next().await {
                Some(Ok(WsMessage::Close(_))) | None => {
                    debug!("client {id}: closed by peer");
                    break;
                }
                Some(Ok(_)) => {
                    // Inbound frames carry nothing we act on.
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => break,
                Some(Err(e)) => {
                    debug!("client {id}: receive error: {e}");
                    break;
                }
            }
        }
        anyhow::Ok(())
    };

    let outcome = tokio::select! {
        result = writer => result,
        result = reader => result,
    };

    registry.remove(id);
    info!("client {id} disconnected ({peer_addr})");

    outcome
}

// ── Tests ─────────────────────────────────────────────────────────────────────
