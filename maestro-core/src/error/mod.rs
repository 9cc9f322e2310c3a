//! Error types and handling framework.
//!
//! Errors are organized hierarchically:
//! - `MaestroError` - top-level error type
//!   - `EngineError` - execution engine failures
//!   - `OrchestratorError` - reconciliation and lifecycle failures
//!   - `StreamError` - log broadcast channel failures
//!   - `ConfigError` - configuration failures
//!
//! Per-worker errors are contained at the worker/channel boundary and
//! recorded on that worker's record; only failures of the reconciliation
//! and scheduling loops themselves escalate to the operator.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod config;
mod engine;
mod orchestrator;
mod stream;

pub use config::ConfigError;
pub use engine::EngineError;
pub use orchestrator::OrchestratorError;
pub use stream::StreamError;

/// Error severity levels for categorizing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Unrecoverable error requiring operator attention.
    Fatal,
    /// Error that can be retried or recovered from.
    #[default]
    Recoverable,
    /// Non-critical issue worth logging.
    Warning,
}

impl ErrorSeverity {
    /// Returns true if this error is recoverable (not fatal).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Fatal)
    }

    /// Returns the severity as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Recoverable => "RECOVERABLE",
            Self::Warning => "WARNING",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Top-level error type for the Maestro orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaestroError {
    /// Execution engine error.
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// Reconciliation or lifecycle error.
    #[error("{0}")]
    Orchestrator(#[from] OrchestratorError),

    /// Log broadcast channel error.
    #[error("{0}")]
    Stream(#[from] StreamError),

    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl MaestroError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Engine(e) => e.severity(),
            Self::Orchestrator(e) => e.severity(),
            Self::Stream(e) => e.severity(),
            Self::Config(_) => ErrorSeverity::Fatal,
        }
    }

    /// Returns the error category as a string.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Engine(_) => "engine",
            Self::Orchestrator(_) => "orchestrator",
            Self::Stream(_) => "stream",
            Self::Config(_) => "config",
        }
    }
}

/// A specialized Result type for Maestro operations.
pub type Result<T> = std::result::Result<T, MaestroError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_display() {
        assert_eq!(ErrorSeverity::Fatal.to_string(), "FATAL");
        assert!(!ErrorSeverity::Fatal.is_recoverable());
        assert!(ErrorSeverity::Warning.is_recoverable());
    }

    #[test]
    fn test_engine_error_conversion() {
        let err: MaestroError = EngineError::InitFailed {
            reason: "no feed".to_string(),
        }
        .into();
        assert_eq!(err.category(), "engine");
        assert_eq!(err.severity(), ErrorSeverity::Fatal);
    }

    #[test]
    fn test_orchestrator_error_conversion() {
        let err: MaestroError = OrchestratorError::UnknownStrategy {
            strategy: "mystery".to_string(),
        }
        .into();
        assert_eq!(err.category(), "orchestrator");
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let err = MaestroError::Stream(StreamError::ObserverLimit { max: 64 });
        let json = serde_json::to_string(&err).unwrap();
        let parsed: MaestroError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, parsed);
    }
}
