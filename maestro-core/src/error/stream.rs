//! Log broadcast channel error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ErrorSeverity;

/// Stream error type for the per-worker log broadcast channel.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamError {
    /// The ephemeral listener could not bind.
    #[error("[Stream] Listener bind failed: {reason}")]
    Bind {
        /// Why the bind failed.
        reason: String,
    },

    /// Observer limit reached; the connection is refused with an explicit
    /// close, with no effect on the worker.
    #[error("[Stream] Too many observers (max {max})")]
    ObserverLimit {
        /// Configured maximum concurrent observers.
        max: usize,
    },

    /// The channel is already closed.
    #[error("[Stream] Channel closed")]
    Closed,
}

impl StreamError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Bind { .. } => ErrorSeverity::Recoverable,
            Self::ObserverLimit { .. } | Self::Closed => ErrorSeverity::Warning,
        }
    }
}
