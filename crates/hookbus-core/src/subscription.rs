//! Subscription disposer

use crate::registry::{Registry, SubscriberId};
use std::sync::Weak;

/// Handle returned by every subscribe call
///
/// Dropping it leaves the registration in place; call [`Subscription::dispose`]
/// to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    channel: String,
    id: SubscriberId,
    registry: Weak<Registry>,
}

impl Subscription {
    pub(crate) fn new(channel: impl Into<String>, id: SubscriberId, registry: Weak<Registry>) -> Self {
        Self {
            channel: channel.into(),
            id,
            registry,
        }
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove exactly this registration
    ///
    /// Returns false when it was already removed (disposed earlier, fired as a
    /// once-subscriber, or the bus is gone).
    pub fn dispose(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(&self.channel, self.id))
    }
}
