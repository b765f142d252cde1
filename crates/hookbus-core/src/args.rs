//! Positional event arguments
//!
//! Every dispatch carries its arguments as a list of JSON values so that the
//! same call can be relayed verbatim to sibling processes.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Errors raised while decoding a positional argument
#[derive(Debug, thiserror::Error)]
pub enum ArgError {
    #[error("Missing argument at position {0}")]
    Missing(usize),

    #[error("Invalid argument at position {index}: {source}")]
    Invalid {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Shared, immutable argument list handed to every subscriber of one dispatch
#[derive(Clone, Default, PartialEq)]
pub struct EventArgs(Arc<Vec<Value>>);

impl EventArgs {
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self(Arc::new(values))
    }

    /// An empty argument list
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a single-argument list from any serializable value
    pub fn single<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(vec![serde_json::to_value(value)?]))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw value at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Decode the value at `index` into `T`
    ///
    /// A missing trailing argument decodes as `null`, so `Option<T>` targets
    /// accept calls that omit optional arguments.
    pub fn parse<T: DeserializeOwned>(&self, index: usize) -> Result<T, ArgError> {
        let value = self.0.get(index).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|source| {
            if index >= self.0.len() {
                ArgError::Missing(index)
            } else {
                ArgError::Invalid { index, source }
            }
        })
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.as_ref().clone()
    }
}

impl From<Vec<Value>> for EventArgs {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl fmt::Debug for EventArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for EventArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}

/// Build an [`EventArgs`] from a list of JSON-compatible expressions
///
/// ```ignore
/// bus.fan_out(channels::ITEM_CREATED, args![item_id, "draft"]).await?;
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::EventArgs::empty()
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::EventArgs::new(vec![$($crate::__private::json!($arg)),+])
    };
}
