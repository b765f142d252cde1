//! # hookbus-relay
//!
//! Transports that carry `broadcast` packets between processes, and the
//! [`Relay`] loop that feeds received packets back into a local bus.
//!
//! - [`RedisTransport`] / [`RedisListener`]: Redis pub/sub on one shared channel
//! - [`MemoryHub`]: a tokio broadcast channel shared by buses of one process

pub mod memory;
pub mod pool;
pub mod pubsub;
pub mod relay;

pub use memory::{MemoryHub, MemoryTransport};
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};
pub use pubsub::{ListenerConfig, ListenerError, RedisListener, RedisTransport};
pub use relay::{Relay, RelayStats};
