//! Process supervisor: runs the serial loop and the WebSocket server side by
//! side.
//!
//! ```text
//!  spawn_blocking                          tokio task per client
//! ┌──────────────┐  publish  ┌──────────┐  try_send  ┌────────────┐
//! │ SerialSource │──────────►│Broadcaster│──────────►│ session ×N │
//! └──────────────┘           └──────────┘  registry  └────────────┘
//!                                               ▲ add/remove
//!                                         accept loop (serve)
//! ```
//!
//! The two loops only meet in the client registry.  Both run until the
//! shared `running` flag is cleared; neither stops on its own.

use std::sync::{atomic::AtomicBool, Arc};

use anyhow::Context;
use serial_core::{SerialOpener, SerialSource};
use tokio::net::TcpListener;
use tracing::info;

use crate::application::{Broadcaster, ClientRegistry};
use crate::domain::BridgeConfig;
use crate::infrastructure::client_channel::SharedRegistry;
use crate::infrastructure::ws_server::{bind_listener, serve};

/// Binds the listener and runs the bridge until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound; nothing has been started
/// at that point.  Also returns an error if the serial thread panicked.
pub async fn run_bridge<O>(
    config: BridgeConfig,
    opener: O,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()>
where
    O: SerialOpener + 'static,
{
    let listener = bind_listener(config.ws_bind_addr).await?;
    let registry: SharedRegistry = Arc::new(ClientRegistry::new());
    run_bridge_on(listener, registry, config, opener, running).await
}

/// Runs the bridge on an already-bound listener and a caller-supplied
/// registry.  `config.ws_bind_addr` is ignored.
///
/// # Errors
///
/// Returns an error if the serial thread panicked.
pub async fn run_bridge_on<O>(
    listener: TcpListener,
    registry: SharedRegistry,
    config: BridgeConfig,
    opener: O,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()>
where
    O: SerialOpener + 'static,
{
    let broadcaster = Broadcaster::new(Arc::clone(&registry));
    let mut source = SerialSource::new(opener, config.serial);

    // The serial read blocks for up to the read timeout, so it gets its own
    // thread rather than a runtime worker.
    let serial_running = Arc::clone(&running);
    let serial_task = tokio::task::spawn_blocking(move || {
        source.run(&broadcaster, &serial_running);
        source.stats()
    });

    serve(listener, registry, config.client_queue, running).await;

    let stats = serial_task.await.context("serial thread panicked")?;
    info!(
        "bridge stopped: {} reading(s), {} open(s), {} open failure(s), {} read failure(s), {} inactivity reset(s)",
        stats.readings, stats.opens, stats.open_failures, stats.read_failures, stats.inactivity_resets
    );
    Ok(())
}
