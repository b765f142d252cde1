//! In-memory relay for single-process deployments and tests.
//!
//! Several buses built on one [`MemoryHub`] behave like processes sharing a
//! Redis channel: every bus, the sender included, receives each packet once.

use async_trait::async_trait;
use hookbus_core::{BroadcastPacket, Delivery, Transport, TransportError};
use tokio::sync::broadcast;

/// Shared channel connecting the buses of one process
#[derive(Debug, Clone)]
pub struct MemoryHub {
    tx: broadcast::Sender<BroadcastPacket>,
}

impl MemoryHub {
    /// Create a hub buffering up to `buffer_size` packets per receiver
    #[must_use]
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size.max(1));
        Self { tx }
    }

    /// Transport publishing into this hub
    #[must_use]
    pub fn transport(&self) -> MemoryTransport {
        MemoryTransport {
            tx: self.tx.clone(),
        }
    }

    /// Receiver for one attached bus
    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<BroadcastPacket> {
        self.tx.subscribe()
    }

    /// Number of attached receivers
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Publishing half of a [`MemoryHub`]
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    tx: broadcast::Sender<BroadcastPacket>,
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn publish(&self, packet: &BroadcastPacket) -> Result<Delivery, TransportError> {
        // With no receiver attached not even the sender would see the packet.
        let receivers = self
            .tx
            .send(packet.clone())
            .map_err(|_| TransportError::Closed)?;

        tracing::trace!(channel = %packet.channel, receivers, "Published to memory hub");

        Ok(Delivery::Relayed)
    }
}
