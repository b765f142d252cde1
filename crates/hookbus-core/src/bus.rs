//! Event bus facade
//!
//! One [`EventBus`] is built by the composition root and shared as
//! `Arc<EventBus>` with every component that subscribes or dispatches.
//!
//! ```ignore
//! let bus = Arc::new(EventBus::new(BusConfig::default()));
//!
//! bus.subscribe(channels::ITEM_CREATED, "notify-owner", Handler::new(|args| async move {
//!     let item_id: u64 = args.parse(0)?;
//!     notify(item_id).await?;
//!     anyhow::Ok(Value::Null)
//! }));
//!
//! bus.fan_out(channels::ITEM_CREATED, args![item_id]).await?;
//! ```

use crate::args::EventArgs;
use crate::config::BusConfig;
use crate::dispatcher::Dispatcher;
use crate::error::BusResult;
use crate::handler::Handler;
use crate::registry::{Position, Registry, SubscriberId};
use crate::subscription::Subscription;
use crate::transport::{BroadcastPacket, Delivery, LocalTransport, Transport};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Process-wide publish/subscribe bus
pub struct EventBus {
    node_id: Uuid,
    config: BusConfig,
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    transport: Arc<dyn Transport>,
}

impl EventBus {
    /// Create a bus whose broadcasts stay in this process
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        Self::with_transport(config, Arc::new(LocalTransport))
    }

    /// Create a bus that relays broadcasts through `transport`
    #[must_use]
    pub fn with_transport(config: BusConfig, transport: Arc<dyn Transport>) -> Self {
        let registry = Arc::new(Registry::new(config.high_water_mark));
        let dispatcher = Dispatcher::new(registry.clone(), config.debug);
        let node_id = Uuid::new_v4();

        tracing::info!(
            node_id = %node_id,
            transport = transport.name(),
            high_water_mark = config.high_water_mark,
            debug = config.debug,
            "Event bus created"
        );

        Self {
            node_id,
            config,
            registry,
            dispatcher,
            transport,
        }
    }

    /// Identifier stamped on every packet this bus broadcasts
    #[must_use]
    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    #[must_use]
    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Append a handler to the channel
    pub fn subscribe(&self, channel: &str, label: impl Into<String>, handler: Handler) -> Subscription {
        self.register(channel, label, handler, false, Position::Back)
    }

    /// Insert a handler in front of the existing ones
    pub fn subscribe_priority(
        &self,
        channel: &str,
        label: impl Into<String>,
        handler: Handler,
    ) -> Subscription {
        self.register(channel, label, handler, false, Position::Front)
    }

    /// Append a handler that unsubscribes itself before its first run
    pub fn subscribe_once(&self, channel: &str, label: impl Into<String>, handler: Handler) -> Subscription {
        self.register(channel, label, handler, true, Position::Back)
    }

    /// Remove the first registration of `handler`
    pub fn unsubscribe(&self, channel: &str, handler: &Handler) -> bool {
        self.registry.remove_handler(channel, handler)
    }

    /// Remove a registration by id
    pub fn unsubscribe_id(&self, channel: &str, id: SubscriberId) -> bool {
        self.registry.remove(channel, id)
    }

    fn register(
        &self,
        channel: &str,
        label: impl Into<String>,
        handler: Handler,
        once: bool,
        position: Position,
    ) -> Subscription {
        let label = label.into();
        let id = self
            .registry
            .insert(channel, label.clone(), handler, once, position);

        tracing::trace!(
            channel = %channel,
            subscriber = %label,
            id = %id,
            once,
            priority = position == Position::Front,
            "Subscriber registered"
        );

        Subscription::new(channel, id, Arc::downgrade(&self.registry))
    }

    /// Alias of [`EventBus::subscribe`]
    pub fn on(&self, channel: &str, label: impl Into<String>, handler: Handler) -> Subscription {
        self.subscribe(channel, label, handler)
    }

    /// Alias of [`EventBus::subscribe_once`]
    pub fn once(&self, channel: &str, label: impl Into<String>, handler: Handler) -> Subscription {
        self.subscribe_once(channel, label, handler)
    }

    /// Alias of [`EventBus::subscribe_priority`]
    pub fn prepend(&self, channel: &str, label: impl Into<String>, handler: Handler) -> Subscription {
        self.subscribe_priority(channel, label, handler)
    }

    /// Alias of [`EventBus::unsubscribe`]
    pub fn off(&self, channel: &str, handler: &Handler) -> bool {
        self.unsubscribe(channel, handler)
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    #[must_use]
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.registry.len(channel)
    }

    /// Channels that currently have subscribers
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        self.registry.channels()
    }

    /// Subscriber labels of a channel in dispatch order
    #[must_use]
    pub fn labels(&self, channel: &str) -> Vec<String> {
        self.registry.labels(channel)
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Run every subscriber concurrently; see [`Dispatcher::fan_out`]
    pub async fn fan_out(&self, channel: &str, args: EventArgs) -> BusResult<()> {
        self.dispatcher.fan_out(channel, args).await
    }

    /// Alias of [`EventBus::fan_out`]
    pub async fn emit(&self, channel: &str, args: EventArgs) -> BusResult<()> {
        self.fan_out(channel, args).await
    }

    /// Run subscribers in order; see [`Dispatcher::sequential`]
    pub async fn sequential(&self, channel: &str, args: EventArgs) -> BusResult<()> {
        self.dispatcher.sequential(channel, args).await
    }

    /// Run subscribers in order until one returns a value; see [`Dispatcher::bail`]
    pub async fn bail(&self, channel: &str, args: EventArgs) -> BusResult<Option<Value>> {
        self.dispatcher.bail(channel, args).await
    }

    /// Fan out here and in every sibling process reachable by the transport
    ///
    /// With a relaying transport the local fan-out happens on this node's
    /// receive path, so the returned result only covers the publish step. If
    /// publishing fails the bus falls back to a local fan-out and returns its
    /// result.
    pub async fn broadcast(&self, channel: &str, args: EventArgs) -> BusResult<()> {
        let packet = BroadcastPacket::new(channel, &args, self.node_id);

        match self.transport.publish(&packet).await {
            Ok(Delivery::Relayed) => {
                if self.config.debug {
                    tracing::debug!(
                        channel = %channel,
                        transport = self.transport.name(),
                        "Broadcast relayed"
                    );
                }
                Ok(())
            }
            Ok(Delivery::LocalOnly) => self.fan_out(channel, args).await,
            Err(err) => {
                tracing::warn!(
                    channel = %channel,
                    transport = self.transport.name(),
                    error = %err,
                    "Broadcast relay failed, dispatching locally only"
                );
                self.fan_out(channel, args).await
            }
        }
    }

    /// Receive path for relayed packets
    pub async fn deliver(&self, packet: BroadcastPacket) -> BusResult<()> {
        tracing::trace!(
            channel = %packet.channel,
            origin = %packet.origin,
            local = packet.origin == self.node_id,
            "Delivering relayed event"
        );
        self.fan_out(&packet.channel, packet.event_args()).await
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("node_id", &self.node_id)
            .field("transport", &self.transport.name())
            .field("registry", &self.registry)
            .finish()
    }
}
