//! # hookbus-core
//!
//! In-process event bus: a subscription registry, three dispatch disciplines
//! (fan-out, sequential, bail) and a pluggable broadcast transport for
//! relaying events to sibling processes.
//! This crate has no dependency on any concrete transport (Redis, etc.).

pub mod args;
pub mod bus;
pub mod channels;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod registry;
pub mod subscription;
pub mod transport;

// Re-export commonly used types at crate root
pub use args::{ArgError, EventArgs};
pub use bus::EventBus;
pub use config::{BusConfig, DEFAULT_HIGH_WATER_MARK};
pub use dispatcher::Dispatcher;
pub use error::{BusError, BusResult};
pub use handler::{is_present, Handler, HandlerFuture, HandlerResult};
pub use registry::{Position, Registry, Subscriber, SubscriberId};
pub use subscription::Subscription;
pub use transport::{BroadcastPacket, Delivery, LocalTransport, Transport, TransportError};

#[doc(hidden)]
pub mod __private {
    pub use serde_json::json;
}
