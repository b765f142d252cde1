//! Test fixtures and data generators
//!
//! Provides reusable subscribers for integration tests.

use hookbus_core::{EventArgs, Handler};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Channel name no other test uses
pub fn unique_channel(prefix: &str) -> String {
    format!("{prefix}/{}", unique_suffix())
}

/// One recorded invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub label: &'static str,
    pub args: Vec<Value>,
}

/// Shared log of subscriber invocations in call order
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler that records its call and returns `result`
    pub fn handler(&self, label: &'static str, result: Value) -> Handler {
        let calls = self.calls.clone();
        Handler::sync(move |args: EventArgs| {
            calls.lock().push(Call {
                label,
                args: args.to_vec(),
            });
            Ok(result.clone())
        })
    }

    /// Handler that records its call and fails
    pub fn failing(&self, label: &'static str, message: &'static str) -> Handler {
        let calls = self.calls.clone();
        Handler::sync(move |args: EventArgs| {
            calls.lock().push(Call {
                label,
                args: args.to_vec(),
            });
            Err(anyhow::anyhow!(message))
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Labels in call order
    pub fn labels(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(|call| call.label).collect()
    }

    pub fn count(&self, label: &str) -> usize {
        self.calls.lock().iter().filter(|call| call.label == label).count()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}
