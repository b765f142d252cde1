//! Per-process user cache kept coherent across processes.
//!
//! Keys look like `id/<uid>/<domain>`, `name/<uname>/<domain>` or
//! `mail/<mail>/<domain>`. Any process that changes a user broadcasts
//! `user/delcache`; every process, the sender included, evicts on receipt.

use dashmap::DashMap;
use hookbus_core::{channels, BusResult, EventArgs, EventBus, Handler, Subscription};
use serde_json::Value;
use std::sync::Arc;

/// Process-local user document cache
#[derive(Debug, Default)]
pub struct UserCache {
    entries: DashMap<String, Value>,
}

impl UserCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict entries matching a `user/delcache` target
    ///
    /// A string target is a domain id and drops every entry of that domain.
    /// An object target (`_id`, `uname`, `mail`) drops every entry of that
    /// user across domains. Returns the number of evicted entries.
    pub fn evict(&self, target: &Value) -> usize {
        let before = self.entries.len();

        match target {
            Value::String(domain) => {
                let suffix = format!("/{domain}");
                self.entries.retain(|key, _| !key.ends_with(&suffix));
            }
            Value::Object(user) => {
                let mut ids = Vec::with_capacity(3);
                match user.get("_id") {
                    Some(Value::Number(n)) => ids.push(format!("id/{n}")),
                    Some(Value::String(s)) => ids.push(format!("id/{s}")),
                    _ => {}
                }
                if let Some(uname) = user.get("uname").and_then(Value::as_str) {
                    ids.push(format!("name/{}", uname.to_lowercase()));
                }
                if let Some(mail) = user.get("mail").and_then(Value::as_str) {
                    ids.push(format!("mail/{}", mail.to_lowercase()));
                }
                self.entries
                    .retain(|key, _| !ids.iter().any(|id| key_prefix(key) == id.as_str()));
            }
            _ => return 0,
        }

        before.saturating_sub(self.entries.len())
    }

    /// Drop one key, or everything when `key` is `None`
    pub fn invalidate(&self, key: Option<&str>) -> usize {
        match key {
            Some(key) => usize::from(self.entries.remove(key).is_some()),
            None => {
                let count = self.entries.len();
                self.entries.clear();
                count
            }
        }
    }

    /// Subscribe the cache to its invalidation channels
    pub fn register(self: &Arc<Self>, bus: &EventBus) -> Vec<Subscription> {
        let on_delcache = {
            let cache = Arc::clone(self);
            Handler::sync(move |args| {
                let target = args.get(0).cloned().unwrap_or(Value::Null);
                let evicted = cache.evict(&target);
                tracing::debug!(delcache = %target, evicted, "User cache evicted");
                Ok(Value::Null)
            })
        };

        let on_invalidate = {
            let cache = Arc::clone(self);
            Handler::sync(move |args| {
                let key: Option<String> = args.parse(0)?;
                let evicted = cache.invalidate(key.as_deref());
                tracing::debug!(key = ?key, evicted, "Cache invalidated");
                Ok(Value::Null)
            })
        };

        vec![
            bus.subscribe(channels::USER_DELCACHE, "user-cache/delcache", on_delcache),
            bus.subscribe(channels::CACHE_INVALIDATE, "user-cache/invalidate", on_invalidate),
        ]
    }
}

/// `<kind>/<value>` part of a cache key
fn key_prefix(key: &str) -> &str {
    match key.match_indices('/').nth(1) {
        Some((end, _)) => &key[..end],
        None => key,
    }
}

/// Ask every process to evict `target` from its user cache
pub async fn delete_user_cache(bus: &EventBus, target: Value) -> BusResult<()> {
    bus.broadcast(channels::USER_DELCACHE, EventArgs::new(vec![target]))
        .await
}
