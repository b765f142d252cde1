//! Bus errors

/// Failures surfaced to a dispatch caller
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Subscriber '{label}' on '{channel}' failed: {source}")]
    SubscriberFailure {
        channel: String,
        label: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Subscriber '{label}' on '{channel}' panicked")]
    SubscriberPanicked { channel: String, label: String },

    #[error("Subscriber '{label}' on '{channel}' was aborted before completing")]
    SubscriberAborted { channel: String, label: String },
}

impl BusError {
    /// Channel the failing dispatch was running on
    #[must_use]
    pub fn channel(&self) -> &str {
        match self {
            Self::SubscriberFailure { channel, .. }
            | Self::SubscriberPanicked { channel, .. }
            | Self::SubscriberAborted { channel, .. } => channel,
        }
    }

    /// Label of the subscriber that failed
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::SubscriberFailure { label, .. }
            | Self::SubscriberPanicked { label, .. }
            | Self::SubscriberAborted { label, .. } => label,
        }
    }

    /// The handler's own error, if it returned one
    #[must_use]
    pub fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::SubscriberFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for dispatch operations
pub type BusResult<T> = Result<T, BusError>;
