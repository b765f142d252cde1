//! Item counters maintained from item lifecycle events.

use hookbus_core::{channels, EventBus, Handler, Subscription};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Running totals of created and deleted items
#[derive(Debug, Default)]
pub struct ItemCounters {
    created: AtomicU64,
    deleted: AtomicU64,
}

impl ItemCounters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn deleted(&self) -> u64 {
        self.deleted.load(Ordering::SeqCst)
    }

    /// Items currently alive according to the events seen
    #[must_use]
    pub fn live(&self) -> u64 {
        self.created().saturating_sub(self.deleted())
    }

    pub fn register(self: &Arc<Self>, bus: &EventBus) -> Vec<Subscription> {
        let on_created = {
            let counters = Arc::clone(self);
            Handler::sync(move |_| {
                let total = counters.created.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Value::from(total))
            })
        };
        let on_deleted = {
            let counters = Arc::clone(self);
            Handler::sync(move |_| {
                let total = counters.deleted.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Value::from(total))
            })
        };

        vec![
            bus.subscribe(channels::ITEM_CREATED, "counters/created", on_created),
            bus.subscribe(channels::ITEM_DELETED, "counters/deleted", on_deleted),
        ]
    }
}
