//! Dispatch disciplines
//!
//! All three work on a registry snapshot taken when the call starts:
//!
//! - **fan-out**: every subscriber runs as its own task; the call settles when
//!   all have settled, or fails as soon as the first failure is observed.
//!   Siblings that were already started keep running.
//! - **sequential**: one subscriber at a time in registry order; the first
//!   failure stops the chain.
//! - **bail**: like sequential, but the first present return value stops the
//!   chain and is handed back to the caller.
//!
//! Subscriber bodies are polled one at a time per bus, even on a multi-thread
//! runtime. Invocations interleave only at their own await points.

use crate::args::EventArgs;
use crate::error::{BusError, BusResult};
use crate::handler::{is_present, HandlerFuture};
use crate::registry::{Registry, Subscriber};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use parking_lot::ReentrantMutex;
use serde_json::Value;
use std::sync::Arc;

/// Runs dispatches against a shared registry
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    // Held for the duration of each poll of a subscriber body. Reentrant so a
    // body that dispatches inline (sequential, bail) can poll nested bodies.
    gate: Arc<ReentrantMutex<()>>,
    debug: bool,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: Arc<Registry>, debug: bool) -> Self {
        Self {
            registry,
            gate: Arc::new(ReentrantMutex::new(())),
            debug,
        }
    }

    /// Invoke every subscriber concurrently
    pub async fn fan_out(&self, channel: &str, args: EventArgs) -> BusResult<()> {
        let snapshot = self.begin("fan_out", channel, &args);

        let mut pending = FuturesUnordered::new();
        for entry in &snapshot {
            let Some(invocation) = self.invoke(channel, entry, &args) else {
                continue;
            };
            let label = entry.label().to_string();
            // Detached on drop: an early return below leaves siblings running.
            let task = tokio::spawn(invocation);
            pending.push(task.map(move |joined| (label, joined)));
        }

        while let Some((label, joined)) = pending.next().await {
            match joined {
                Ok(Ok(_)) => {}
                Ok(Err(source)) => return Err(failure(channel, label, source)),
                Err(err) if err.is_panic() => {
                    return Err(BusError::SubscriberPanicked {
                        channel: channel.to_string(),
                        label,
                    })
                }
                Err(_) => {
                    return Err(BusError::SubscriberAborted {
                        channel: channel.to_string(),
                        label,
                    })
                }
            }
        }

        Ok(())
    }

    /// Invoke subscribers one after another, stopping at the first failure
    pub async fn sequential(&self, channel: &str, args: EventArgs) -> BusResult<()> {
        let snapshot = self.begin("sequential", channel, &args);

        for entry in &snapshot {
            let Some(invocation) = self.invoke(channel, entry, &args) else {
                continue;
            };
            invocation
                .await
                .map_err(|source| failure(channel, entry.label().to_string(), source))?;
        }

        Ok(())
    }

    /// Invoke subscribers in order until one returns a present value
    ///
    /// Returns `Ok(None)` when every subscriber returned `null` or `false`.
    pub async fn bail(&self, channel: &str, args: EventArgs) -> BusResult<Option<Value>> {
        let snapshot = self.begin("bail", channel, &args);

        for entry in &snapshot {
            let Some(invocation) = self.invoke(channel, entry, &args) else {
                continue;
            };
            let value = invocation
                .await
                .map_err(|source| failure(channel, entry.label().to_string(), source))?;

            if is_present(&value) {
                if self.debug {
                    tracing::debug!(
                        channel = %channel,
                        subscriber = %entry.label(),
                        "bail: dispatch stopped by subscriber"
                    );
                }
                return Ok(Some(value));
            }
        }

        Ok(None)
    }

    fn begin(&self, discipline: &'static str, channel: &str, args: &EventArgs) -> Vec<Arc<Subscriber>> {
        let snapshot = self.registry.snapshot(channel);
        if self.debug {
            tracing::debug!(
                discipline,
                channel = %channel,
                args = %args,
                subscribers = snapshot.len(),
                "Dispatching event"
            );
        }
        snapshot
    }

    /// Build one invocation, retiring once-subscribers before they run
    fn invoke(&self, channel: &str, entry: &Subscriber, args: &EventArgs) -> Option<HandlerFuture> {
        if entry.is_once() {
            if !entry.claim() {
                return None;
            }
            self.registry.remove(channel, entry.id());
        }

        if self.debug {
            tracing::debug!(
                channel = %channel,
                subscriber = %entry.label(),
                id = %entry.id(),
                once = entry.is_once(),
                "Invoking subscriber"
            );
        }

        Some(self.gated(entry.handler().call(args.clone())))
    }

    fn gated(&self, mut invocation: HandlerFuture) -> HandlerFuture {
        let gate = self.gate.clone();
        futures::future::poll_fn(move |cx| {
            let _turn = gate.lock();
            invocation.poll_unpin(cx)
        })
        .boxed()
    }
}

fn failure(channel: &str, label: String, source: anyhow::Error) -> BusError {
    BusError::SubscriberFailure {
        channel: channel.to_string(),
        label,
        source,
    }
}
