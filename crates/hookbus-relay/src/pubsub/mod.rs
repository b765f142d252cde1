//! Redis pub/sub transport
//!
//! Every process publishes to and listens on the same channel, so a
//! broadcast reaches the sender too.

mod listener;
mod publisher;

pub use listener::{ListenerConfig, ListenerError, RedisListener};
pub use publisher::RedisTransport;
