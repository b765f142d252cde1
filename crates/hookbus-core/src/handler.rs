//! Subscriber handler type
//!
//! A handler is a reference-counted callable. Cloning a [`Handler`] keeps its
//! identity, which is what [`crate::EventBus::unsubscribe`] compares against.

use crate::args::EventArgs;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Outcome of one subscriber invocation
///
/// `Ok(Value::Null)` means "nothing to report"; only `bail` dispatch looks at
/// the returned value.
pub type HandlerResult = anyhow::Result<Value>;

/// Boxed future produced by a handler invocation
pub type HandlerFuture = BoxFuture<'static, HandlerResult>;

type HandlerFn = dyn Fn(EventArgs) -> HandlerFuture + Send + Sync;

/// Callable registered under a channel
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    /// Wrap an async closure
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(EventArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self(Arc::new(move |args| f(args).boxed()))
    }

    /// Wrap a synchronous closure
    ///
    /// The body still runs when the returned future is first polled, not when
    /// the dispatcher builds the future.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(EventArgs) -> HandlerResult + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self(Arc::new(move |args| {
            let f = Arc::clone(&f);
            async move { f(args) }.boxed()
        }))
    }

    /// Start one invocation
    #[must_use]
    pub fn call(&self, args: EventArgs) -> HandlerFuture {
        (self.0)(args)
    }

    /// Whether both values refer to the same registered callable
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Whether a `bail` subscriber produced a value that stops dispatch
///
/// Everything except `null` and `false` counts, including `0`, `""` and
/// empty collections.
#[must_use]
pub fn is_present(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}
