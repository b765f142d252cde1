//! Redis Pub/Sub publisher side of the transport.

use crate::pool::RedisPool;
use async_trait::async_trait;
use hookbus_core::{BroadcastPacket, Delivery, Transport, TransportError};
use redis::AsyncCommands;

/// Publishes broadcast packets on a shared Redis channel
#[derive(Debug, Clone)]
pub struct RedisTransport {
    pool: RedisPool,
    channel: String,
}

impl RedisTransport {
    #[must_use]
    pub fn new(pool: RedisPool, channel: impl Into<String>) -> Self {
        Self {
            pool,
            channel: channel.into(),
        }
    }

    /// Redis channel packets are published on
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl Transport for RedisTransport {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn publish(&self, packet: &BroadcastPacket) -> Result<Delivery, TransportError> {
        let payload = packet.to_json()?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| TransportError::Publish(e.to_string()))?;

        let receivers: u32 = conn
            .publish(&self.channel, &payload)
            .await
            .map_err(|e| TransportError::Publish(e.to_string()))?;

        tracing::debug!(
            redis_channel = %self.channel,
            channel = %packet.channel,
            receivers = receivers,
            "Published broadcast"
        );

        // Nobody listening, not even this node's own listener
        if receivers == 0 {
            return Err(TransportError::Closed);
        }

        Ok(Delivery::Relayed)
    }
}
