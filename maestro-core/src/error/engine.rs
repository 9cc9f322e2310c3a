//! Execution engine error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ErrorSeverity;

/// Engine error type covering initialization, execution, and state
/// persistence failures.
///
/// All variants are contained at the worker boundary: they force the
/// worker into `Errored`, never the host process down.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineError {
    /// Engine could not initialize (connectivity, invalid parameters).
    #[error("[Engine] Initialization failed: {reason}")]
    InitFailed {
        /// Why initialization failed.
        reason: String,
    },

    /// Engine main loop failed.
    #[error("[Engine] Execution error: {reason}")]
    Execution {
        /// Why execution failed.
        reason: String,
    },

    /// Engine code panicked; caught at the worker boundary.
    #[error("[Engine] Panic: {reason}")]
    Panicked {
        /// Panic payload, if printable.
        reason: String,
    },

    /// Resumable state could not be saved or loaded.
    #[error("[Engine] State persistence failed: {reason}")]
    PersistFailed {
        /// Why persistence failed.
        reason: String,
    },
}

impl EngineError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InitFailed { .. } | Self::Panicked { .. } => ErrorSeverity::Fatal,
            Self::Execution { .. } => ErrorSeverity::Recoverable,
            Self::PersistFailed { .. } => ErrorSeverity::Warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = EngineError::InitFailed {
            reason: "feed unavailable".to_string(),
        };
        assert!(err.to_string().contains("feed unavailable"));
    }

    #[test]
    fn test_severity() {
        assert_eq!(
            EngineError::Panicked {
                reason: "oops".into()
            }
            .severity(),
            ErrorSeverity::Fatal
        );
        assert_eq!(
            EngineError::PersistFailed {
                reason: "disk".into()
            }
            .severity(),
            ErrorSeverity::Warning
        );
    }
}
