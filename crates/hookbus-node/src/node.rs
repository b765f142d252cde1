//! Node composition
//!
//! Builds the bus with the configured transport, wires the relay receive
//! path and the built-in subscribers, and drives the lifecycle channels.

use crate::subscribers::{ItemCounters, UserCache};
use hookbus_common::{AppConfig, AppError, AppResult, TransportKind};
use hookbus_core::{channels, BroadcastPacket, EventArgs, EventBus, Subscription, Transport};
use hookbus_relay::{ListenerConfig, MemoryHub, RedisListener, RedisPool, RedisTransport, Relay};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Where relayed packets come from
#[derive(Debug)]
enum RelaySource {
    Local,
    Redis(RedisListener),
    Memory(MemoryHub),
}

impl RelaySource {
    fn receiver(&self) -> Option<broadcast::Receiver<BroadcastPacket>> {
        match self {
            Self::Local => None,
            Self::Redis(listener) => Some(listener.receiver()),
            Self::Memory(hub) => Some(hub.receiver()),
        }
    }
}

/// A running bus plus everything attached to it
#[derive(Debug)]
pub struct Node {
    bus: Arc<EventBus>,
    relay: Arc<Relay>,
    source: RelaySource,
    user_cache: Arc<UserCache>,
    counters: Arc<ItemCounters>,
    subscriptions: Vec<Subscription>,
}

impl Node {
    /// Build the bus for `config` and register the built-in subscribers
    ///
    /// Must be called inside a tokio runtime when the Redis transport is
    /// selected, since the listener starts right away.
    pub async fn build(config: &AppConfig) -> AppResult<Self> {
        let (transport, source): (Arc<dyn Transport>, RelaySource) = match config.bus.transport {
            TransportKind::Local => (Arc::new(hookbus_core::LocalTransport), RelaySource::Local),
            TransportKind::Memory => {
                let hub = MemoryHub::new(config.relay.buffer);
                (Arc::new(hub.transport()), RelaySource::Memory(hub))
            }
            TransportKind::Redis => {
                let redis = config
                    .redis
                    .as_ref()
                    .ok_or(hookbus_common::ConfigError::MissingVar("REDIS_URL"))?;

                tracing::info!("Connecting to Redis...");
                let pool = RedisPool::from_config(redis).map_err(AppError::cache)?;
                if let Err(e) = pool.health_check().await {
                    // The listener keeps retrying; publishing falls back to local fan-out meanwhile.
                    tracing::warn!(error = %e, "Redis not reachable yet");
                }

                let listener = RedisListener::spawn(ListenerConfig::from_config(redis, &config.relay));
                (
                    Arc::new(RedisTransport::new(pool, config.relay.channel.clone())),
                    RelaySource::Redis(listener),
                )
            }
        };

        let bus = Arc::new(EventBus::with_transport(config.bus_config(), transport));
        let relay = Arc::new(Relay::new(bus.clone()));

        let user_cache = Arc::new(UserCache::new());
        let counters = Arc::new(ItemCounters::new());
        let mut subscriptions = user_cache.register(&bus);
        subscriptions.extend(counters.register(&bus));

        tracing::info!(
            node_id = %bus.node_id(),
            transport = bus.transport_name(),
            builtin_subscribers = subscriptions.len(),
            "Node built"
        );

        Ok(Self {
            bus,
            relay,
            source,
            user_cache,
            counters,
            subscriptions,
        })
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    #[must_use]
    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    #[must_use]
    pub fn user_cache(&self) -> &Arc<UserCache> {
        &self.user_cache
    }

    #[must_use]
    pub fn counters(&self) -> &Arc<ItemCounters> {
        &self.counters
    }

    /// Start the relay and announce `app/started`
    pub async fn start(&self) -> AppResult<()> {
        if let Some(receiver) = self.source.receiver() {
            self.relay.clone().start(receiver);
        }

        self.bus
            .fan_out(channels::APP_STARTED, EventArgs::empty())
            .await?;

        tracing::info!(node_id = %self.bus.node_id(), "Node started");
        Ok(())
    }

    /// Announce `app/exit`, then detach from the transport
    ///
    /// Exit subscribers run before the relay stops; a failing one is logged
    /// and does not prevent the rest of the shutdown.
    pub async fn shutdown(self) -> AppResult<()> {
        let exit = self
            .bus
            .fan_out(channels::APP_EXIT, EventArgs::empty())
            .await;
        if let Err(e) = &exit {
            tracing::error!(subscriber = %e.label(), error = %e, "Exit subscriber failed");
        }

        self.relay.stop();
        if let RelaySource::Redis(listener) = &self.source {
            listener.shutdown().await.ok();
        }
        for subscription in &self.subscriptions {
            subscription.dispose();
        }

        tracing::info!(node_id = %self.bus.node_id(), "Node stopped");
        exit.map_err(AppError::from)
    }
}
