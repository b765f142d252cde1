//! Application error types
//!
//! Failures of the node's startup and shutdown path.

use crate::config::ConfigError;
use hookbus_core::{BusError, TransportError};
use std::fmt;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    // Redis errors
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// Get error code for logs and exit reporting
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Bus(_) => "BUS_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Telemetry(_) => "TELEMETRY_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Process exit code for a failed run
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 78,
            Self::Cache(_) | Self::Transport(_) => 69,
            Self::Bus(_) | Self::Telemetry(_) | Self::Internal(_) => 1,
        }
    }

    /// Create a cache error
    #[must_use]
    pub fn cache(msg: impl fmt::Display) -> Self {
        Self::Cache(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
