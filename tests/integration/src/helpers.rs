//! Test helpers for integration tests
//!
//! Provides simulated multi-process clusters over an in-memory hub or Redis,
//! and polling utilities for asserting on asynchronous deliveries.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use hookbus_common::{RedisConfig, RelayConfig};
use hookbus_core::{BusConfig, EventBus, Transport};
use hookbus_relay::{
    ListenerConfig, MemoryHub, RedisListener, RedisPool, RedisPoolConfig, RedisTransport, Relay,
};

/// Default time limit for waiting on relayed deliveries
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// One simulated process: a bus plus its relay loop
pub struct TestNode {
    pub bus: Arc<EventBus>,
    pub relay: Arc<Relay>,
    listener: Option<RedisListener>,
}

impl TestNode {
    /// Stop the relay loop and the listener, if any
    pub async fn stop(&self) {
        self.relay.stop();
        if let Some(listener) = &self.listener {
            listener.shutdown().await.ok();
        }
    }
}

/// Several buses that reach each other through one transport
pub struct TestCluster {
    pub nodes: Vec<TestNode>,
}

impl TestCluster {
    /// Connect `size` buses through a shared in-memory hub
    pub fn memory(size: usize) -> Self {
        let hub = MemoryHub::new(256);
        let nodes = (0..size)
            .map(|_| {
                let transport: Arc<dyn Transport> = Arc::new(hub.transport());
                let bus = Arc::new(EventBus::with_transport(BusConfig::default(), transport));
                let relay = Arc::new(Relay::new(bus.clone()));
                relay.clone().start(hub.receiver());
                TestNode {
                    bus,
                    relay,
                    listener: None,
                }
            })
            .collect();

        Self { nodes }
    }

    /// Connect `size` buses through Redis pub/sub on `channel`
    pub async fn redis(url: &str, channel: &str, size: usize) -> Result<Self> {
        let pool = RedisPool::new(RedisPoolConfig {
            url: url.to_string(),
            max_connections: 4,
        })?;
        let redis = RedisConfig {
            url: url.to_string(),
            max_connections: 4,
        };
        let relay_config = RelayConfig {
            channel: channel.to_string(),
            ..RelayConfig::default()
        };

        let mut nodes = Vec::with_capacity(size);
        for _ in 0..size {
            let listener = RedisListener::spawn(ListenerConfig::from_config(&redis, &relay_config));
            let transport: Arc<dyn Transport> = Arc::new(RedisTransport::new(pool.clone(), channel));
            let bus = Arc::new(EventBus::with_transport(BusConfig::default(), transport));
            let relay = Arc::new(Relay::new(bus.clone()));
            relay.clone().start(listener.receiver());
            nodes.push(TestNode {
                bus,
                relay,
                listener: Some(listener),
            });
        }

        // Let every listener finish SUBSCRIBE before anything is published
        tokio::time::sleep(Duration::from_millis(300)).await;

        Ok(Self { nodes })
    }

    pub fn node(&self, index: usize) -> &TestNode {
        &self.nodes[index]
    }

    pub async fn stop(&self) {
        for node in &self.nodes {
            node.stop().await;
        }
    }
}

/// Poll `condition` until it holds or `WAIT_TIMEOUT` passes
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> Result<()> {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .map_err(|_| anyhow::anyhow!("condition not reached within {WAIT_TIMEOUT:?}"))
}

/// Give in-flight deliveries a chance to show up, for asserting on absence
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

/// Run `fut` with the default time limit
pub async fn with_timeout<T>(fut: impl Future<Output = T>) -> Result<T> {
    tokio::time::timeout(WAIT_TIMEOUT, fut)
        .await
        .map_err(|_| anyhow::anyhow!("timed out after {WAIT_TIMEOUT:?}"))
}

/// Redis URL for Redis-backed tests, or `None` to skip them
///
/// Requires `REDIS_URL` and a server answering PING.
pub async fn check_redis_env() -> Option<String> {
    let _ = dotenvy::dotenv();

    let Ok(url) = std::env::var("REDIS_URL") else {
        eprintln!("Skipping test: REDIS_URL not set");
        return None;
    };

    let pool = RedisPool::new(RedisPoolConfig {
        url: url.clone(),
        max_connections: 1,
    })
    .ok()?;
    match with_timeout(pool.health_check()).await {
        Ok(Ok(())) => Some(url),
        _ => {
            eprintln!("Skipping test: Redis at REDIS_URL not reachable");
            None
        }
    }
}
