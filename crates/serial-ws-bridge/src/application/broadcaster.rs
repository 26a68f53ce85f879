//! Broadcaster: the glue between the serial loop and the client registry.
//!
//! [`SerialSource`](serial_core::SerialSource) calls
//! [`ReadingSink::publish`] for every byte; the broadcaster forwards it
//! verbatim to [`ClientRegistry::broadcast`].  No buffering, no batching: the
//! serial loop reads its next byte only after the fan-out returns.

use std::sync::Arc;

use serial_core::{Reading, ReadingSink};
use tracing::debug;

use super::registry::{ClientRegistry, ClientSink};

pub struct Broadcaster<S> {
    registry: Arc<ClientRegistry<S>>,
}

impl<S: ClientSink> Broadcaster<S> {
    pub fn new(registry: Arc<ClientRegistry<S>>) -> Self {
        Self { registry }
    }
}

impl<S: ClientSink> ReadingSink for Broadcaster<S> {
    fn publish(&self, reading: Reading) {
        let report = self.registry.broadcast(reading);
        debug!(
            "reading {reading} delivered to {} client(s), {} dropped",
            report.delivered, report.dropped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::{MockClientSink, SendError};
    use crate::domain::ClientId;
    use mockall::predicate::eq;

    #[test]
    fn test_publish_forwards_reading_verbatim() {
        // Arrange
        let registry = Arc::new(ClientRegistry::new());
        let mut sink = MockClientSink::new();
        sink.expect_send()
            .with(eq(Reading::new(42)))
            .times(1)
            .returning(|_| Ok(()));
        registry.add(ClientId::new(), sink);
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        // Act
        broadcaster.publish(Reading::new(42));

        // Assert: expectations are verified when the mock drops.
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_publish_with_no_clients_is_noop() {
        let registry: Arc<ClientRegistry<MockClientSink>> = Arc::new(ClientRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        broadcaster.publish(Reading::new(0));

        assert!(registry.is_empty());
    }

    #[test]
    fn test_publish_drops_failed_client() {
        let registry = Arc::new(ClientRegistry::new());
        let mut sink = MockClientSink::new();
        sink.expect_send()
            .returning(|_| Err(SendError::Disconnected));
        registry.add(ClientId::new(), sink);
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        broadcaster.publish(Reading::new(7));

        assert!(registry.is_empty());
    }
}
