//! Subscriber registry
//!
//! Holds, per channel, the ordered list of subscribers. Dispatch never
//! iterates the live list: it takes a [`Registry::snapshot`] first, so
//! subscriptions changed by a running handler only affect later dispatches.

use crate::handler::Handler;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Identifier assigned to every registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a new entry goes in its channel's list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Back,
    Front,
}

/// One registered handler
pub struct Subscriber {
    id: SubscriberId,
    label: String,
    handler: Handler,
    once: bool,
    fired: AtomicBool,
}

impl Subscriber {
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Human-readable label given at subscription time
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    #[must_use]
    pub fn is_once(&self) -> bool {
        self.once
    }

    /// Take the right to run a once-subscriber
    ///
    /// Always true for regular subscribers. For once-subscribers only the
    /// first caller wins, even across dispatches holding older snapshots.
    pub(crate) fn claim(&self) -> bool {
        !self.once || !self.fired.swap(true, Ordering::SeqCst)
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("once", &self.once)
            .finish()
    }
}

/// Channel name to ordered subscriber list
pub struct Registry {
    channels: DashMap<String, Vec<Arc<Subscriber>>>,
    next_id: AtomicU64,
    high_water_mark: usize,
}

impl Registry {
    #[must_use]
    pub fn new(high_water_mark: usize) -> Self {
        Self {
            channels: DashMap::new(),
            next_id: AtomicU64::new(1),
            high_water_mark,
        }
    }

    #[must_use]
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Register a handler and return its id
    ///
    /// Every insertion that leaves the channel above the high-water mark logs a
    /// leak warning but never rejects the registration.
    pub fn insert(
        &self,
        channel: &str,
        label: impl Into<String>,
        handler: Handler,
        once: bool,
        position: Position,
    ) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = Arc::new(Subscriber {
            id,
            label: label.into(),
            handler,
            once,
            fired: AtomicBool::new(false),
        });

        let count = {
            let mut subscribers = self.channels.entry(channel.to_string()).or_default();
            match position {
                Position::Back => subscribers.push(entry),
                Position::Front => subscribers.insert(0, entry),
            }
            subscribers.len()
        };

        if count > self.high_water_mark {
            tracing::warn!(
                channel = %channel,
                subscribers = count,
                high_water_mark = self.high_water_mark,
                "Subscriber count exceeded high-water mark, possible listener leak"
            );
        }

        id
    }

    /// Remove the entry with `id`; false if it is not registered
    pub fn remove(&self, channel: &str, id: SubscriberId) -> bool {
        self.remove_where(channel, |entry| entry.id == id)
    }

    /// Remove the first entry whose handler is `handler`
    pub fn remove_handler(&self, channel: &str, handler: &Handler) -> bool {
        self.remove_where(channel, |entry| entry.handler.ptr_eq(handler))
    }

    fn remove_where(&self, channel: &str, matches: impl Fn(&Subscriber) -> bool) -> bool {
        let removed = match self.channels.get_mut(channel) {
            Some(mut subscribers) => match subscribers.iter().position(|entry| matches(entry)) {
                Some(index) => {
                    subscribers.remove(index);
                    true
                }
                None => false,
            },
            None => false,
        };

        if removed {
            self.channels.remove_if(channel, |_, subscribers| subscribers.is_empty());
        }

        removed
    }

    /// Copy of the channel's current list
    #[must_use]
    pub fn snapshot(&self, channel: &str) -> Vec<Arc<Subscriber>> {
        self.channels
            .get(channel)
            .map(|subscribers| subscribers.value().clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, |subscribers| subscribers.len())
    }

    /// Channels with at least one subscriber, sorted by name
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .channels
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Labels of a channel's subscribers in dispatch order
    #[must_use]
    pub fn labels(&self, channel: &str) -> Vec<String> {
        self.snapshot(channel)
            .iter()
            .map(|entry| entry.label.clone())
            .collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("channels", &self.channels.len())
            .field("high_water_mark", &self.high_water_mark)
            .finish()
    }
}
