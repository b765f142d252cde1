//! Relay loop
//!
//! Receives packets from a transport's listener and fans each one out on the
//! local bus. Every packet gets its own task, so a slow subscriber never
//! holds back the next packet.

use hookbus_core::{BroadcastPacket, EventBus};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Counters of a relay since it was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Packets taken off the receiver
    pub received: u64,
    /// Deliveries whose fan-out succeeded
    pub delivered: u64,
    /// Deliveries whose fan-out reported a failure
    pub failed: u64,
    /// Packets lost because the receiver fell behind
    pub lagged: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    lagged: AtomicU64,
}

/// Feeds relayed packets into a local [`EventBus`]
#[derive(Debug)]
pub struct Relay {
    bus: Arc<EventBus>,
    running: AtomicBool,
    stop_tx: watch::Sender<bool>,
    counters: Arc<Counters>,
}

impl Relay {
    #[must_use]
    pub fn new(bus: Arc<EventBus>) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            bus,
            running: AtomicBool::new(false),
            stop_tx,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Start the relay loop on `receiver`
    ///
    /// Returns `None` if the relay is already running.
    pub fn start(
        self: Arc<Self>,
        receiver: broadcast::Receiver<BroadcastPacket>,
    ) -> Option<JoinHandle<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Relay is already running");
            return None;
        }
        self.stop_tx.send_replace(false);

        let relay = self.clone();
        let handle = tokio::spawn(async move {
            relay.run(receiver).await;
        });

        tracing::info!(node_id = %self.bus.node_id(), "Relay started");
        Some(handle)
    }

    /// Stop the relay loop; deliveries already spawned run to completion
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
        tracing::info!(node_id = %self.bus.node_id(), "Relay stopped");
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn stats(&self) -> RelayStats {
        RelayStats {
            received: self.counters.received.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            lagged: self.counters.lagged.load(Ordering::Relaxed),
        }
    }

    async fn run(&self, mut receiver: broadcast::Receiver<BroadcastPacket>) {
        let mut stop_rx = self.stop_tx.subscribe();

        while !*stop_rx.borrow_and_update() {
            tokio::select! {
                biased;

                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }

                msg = receiver.recv() => {
                    match msg {
                        Ok(packet) => self.dispatch(packet),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            self.counters.lagged.fetch_add(n, Ordering::Relaxed);
                            tracing::warn!(lagged = n, "Relay lagged behind, packets dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::warn!("Relay channel closed");
                            break;
                        }
                    }
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Relay loop ended");
    }

    fn dispatch(&self, packet: BroadcastPacket) {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        let bus = self.bus.clone();
        let counters = self.counters.clone();
        tokio::spawn(async move {
            let channel = packet.channel.clone();
            let origin = packet.origin;

            match bus.deliver(packet).await {
                Ok(()) => {
                    counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        channel = %channel,
                        origin = %origin,
                        subscriber = %e.label(),
                        error = %e,
                        "Relayed event failed"
                    );
                }
            }
        });
    }
}
