//! Redis Pub/Sub listener side of the transport.
//!
//! Holds one pub/sub connection on the relay channel, decodes each payload
//! into a [`BroadcastPacket`] and republishes it on an in-process tokio
//! broadcast channel. A dropped connection is retried after a fixed delay.

use futures_util::StreamExt;
use hookbus_common::{RedisConfig, RelayConfig};
use hookbus_core::BroadcastPacket;
use redis::Client;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::pool::redact_url;

/// Error type for listener operations
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Listener stopped")]
    Stopped,
}

type ListenerResult<T> = Result<T, ListenerError>;

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Redis channel carrying broadcast packets
    pub channel: String,
    /// Buffer of the in-process broadcast channel
    pub broadcast_buffer: usize,
    /// Reconnection delay in milliseconds
    pub reconnect_delay_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        let relay = RelayConfig::default();
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            channel: relay.channel,
            broadcast_buffer: relay.buffer,
            reconnect_delay_ms: relay.reconnect_delay_ms,
        }
    }
}

impl ListenerConfig {
    #[must_use]
    pub fn from_config(redis: &RedisConfig, relay: &RelayConfig) -> Self {
        Self {
            redis_url: redis.url.clone(),
            channel: relay.channel.clone(),
            broadcast_buffer: relay.buffer,
            reconnect_delay_ms: relay.reconnect_delay_ms,
        }
    }
}

#[derive(Debug)]
enum ListenerCommand {
    Shutdown,
}

/// Background subscriber to the relay channel
#[derive(Debug)]
pub struct RedisListener {
    channel: String,
    broadcast_tx: broadcast::Sender<BroadcastPacket>,
    control_tx: mpsc::Sender<ListenerCommand>,
}

impl RedisListener {
    /// Start the background listener
    ///
    /// Must be called inside a tokio runtime. Connection failures are logged
    /// and retried; they never surface here.
    #[must_use]
    pub fn spawn(config: ListenerConfig) -> Self {
        let (broadcast_tx, _) = broadcast::channel(config.broadcast_buffer.max(1));
        let (control_tx, control_rx) = mpsc::channel(4);

        let listener = Self {
            channel: config.channel.clone(),
            broadcast_tx: broadcast_tx.clone(),
            control_tx,
        };

        tokio::spawn(Self::listener_loop(config, broadcast_tx, control_rx));

        listener
    }

    async fn listener_loop(
        config: ListenerConfig,
        broadcast_tx: broadcast::Sender<BroadcastPacket>,
        mut control_rx: mpsc::Receiver<ListenerCommand>,
    ) {
        loop {
            match Self::run_listener(&config, &broadcast_tx, &mut control_rx).await {
                Ok(()) | Err(ListenerError::Stopped) => {
                    tracing::info!(redis_channel = %config.channel, "Listener shutting down");
                    break;
                }
                Err(e) => {
                    tracing::error!(
                        redis_channel = %config.channel,
                        error = %e,
                        "Listener error, reconnecting..."
                    );
                    tokio::select! {
                        () = tokio::time::sleep(Duration::from_millis(config.reconnect_delay_ms)) => {}
                        _ = control_rx.recv() => {
                            tracing::info!(redis_channel = %config.channel, "Listener shutting down");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Run until the connection drops or shutdown is requested
    async fn run_listener(
        config: &ListenerConfig,
        broadcast_tx: &broadcast::Sender<BroadcastPacket>,
        control_rx: &mut mpsc::Receiver<ListenerCommand>,
    ) -> ListenerResult<()> {
        let client = Client::open(config.redis_url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(&config.channel).await?;

        tracing::info!(
            url = %redact_url(&config.redis_url),
            redis_channel = %config.channel,
            "Listener connected to Redis"
        );

        let mut stream = pubsub.on_message();

        loop {
            tokio::select! {
                msg = stream.next() => {
                    let Some(msg) = msg else {
                        tracing::warn!(redis_channel = %config.channel, "Pub/Sub stream ended");
                        return Err(ListenerError::Redis(redis::RedisError::from((
                            redis::ErrorKind::IoError,
                            "pub/sub stream ended",
                        ))));
                    };

                    let payload: String = match msg.get_payload() {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::warn!(error = %e, "Dropping non-text relay payload");
                            continue;
                        }
                    };

                    if let Some(packet) = decode(&payload) {
                        tracing::trace!(
                            channel = %packet.channel,
                            origin = %packet.origin,
                            "Received relayed packet"
                        );
                        // No receivers yet is not an error
                        let _ = broadcast_tx.send(packet);
                    }
                }

                cmd = control_rx.recv() => {
                    match cmd {
                        Some(ListenerCommand::Shutdown) => return Ok(()),
                        None => {
                            tracing::warn!("Control channel closed");
                            return Err(ListenerError::Stopped);
                        }
                    }
                }
            }
        }
    }

    /// Get a receiver of decoded packets
    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<BroadcastPacket> {
        self.broadcast_tx.subscribe()
    }

    /// Redis channel being listened on
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Whether the background loop is still alive
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.control_tx.is_closed()
    }

    /// Stop the background loop
    pub async fn shutdown(&self) -> ListenerResult<()> {
        self.control_tx
            .send(ListenerCommand::Shutdown)
            .await
            .map_err(|_| ListenerError::Stopped)
    }
}

/// Decode a relay payload, logging and skipping anything malformed
fn decode(payload: &str) -> Option<BroadcastPacket> {
    match BroadcastPacket::from_json(payload) {
        Ok(packet) => Some(packet),
        Err(e) => {
            tracing::warn!(error = %e, payload_len = payload.len(), "Dropping undecodable relay payload");
            None
        }
    }
}
