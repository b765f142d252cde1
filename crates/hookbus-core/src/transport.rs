//! Broadcast transport abstraction
//!
//! A transport decides how `broadcast` reaches sibling processes. It is
//! chosen once when the bus is built.
//!
//! - [`Delivery::Relayed`]: the packet went out on a shared channel that every
//!   process, the sender included, listens on. Local dispatch happens on the
//!   receive path through [`crate::EventBus::deliver`].
//! - [`Delivery::LocalOnly`]: nothing left the process; the caller fans out
//!   locally.

use crate::args::EventArgs;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Wire format of one relayed dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastPacket {
    /// Channel to fan out on at every receiver
    pub channel: String,
    /// Positional arguments
    #[serde(default)]
    pub args: Vec<Value>,
    /// Node id of the sending bus
    pub origin: Uuid,
    /// Time the packet was built
    pub sent_at: DateTime<Utc>,
}

impl BroadcastPacket {
    #[must_use]
    pub fn new(channel: impl Into<String>, args: &EventArgs, origin: Uuid) -> Self {
        Self {
            channel: channel.into(),
            args: args.to_vec(),
            origin,
            sent_at: Utc::now(),
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Arguments as handed to local subscribers
    #[must_use]
    pub fn event_args(&self) -> EventArgs {
        EventArgs::new(self.args.clone())
    }
}

/// What a transport did with a published packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent to all processes; local dispatch happens on receipt
    Relayed,
    /// Not sent anywhere; the caller must dispatch locally
    LocalOnly,
}

/// Errors from the cross-process relay path
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to serialize packet: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to publish packet: {0}")]
    Publish(String),

    #[error("Transport closed")]
    Closed,
}

/// Strategy for relaying broadcasts to sibling processes
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Hand a packet to the transport
    async fn publish(&self, packet: &BroadcastPacket) -> Result<Delivery, TransportError>;
}

/// Single-process fallback: broadcasts never leave the process
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTransport;

#[async_trait]
impl Transport for LocalTransport {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn publish(&self, _packet: &BroadcastPacket) -> Result<Delivery, TransportError> {
        Ok(Delivery::LocalOnly)
    }
}
