//! Reconciliation and lifecycle error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ErrorSeverity;
use crate::types::WorkerKey;

/// Orchestrator error type covering spec resolution and lifecycle
/// confirmation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrchestratorError {
    /// Strategy identifier has no registry entry; the create step for
    /// this key is skipped and retried on the next reconciliation.
    #[error("[Orchestrator] Unknown strategy: {strategy}")]
    UnknownStrategy {
        /// The unresolved strategy identifier.
        strategy: String,
    },

    /// Engine kind has no registered factory.
    #[error("[Orchestrator] No factory registered for engine '{engine}'")]
    UnknownEngine {
        /// The unresolved engine selector.
        engine: String,
    },

    /// Graceful shutdown did not confirm within the bound; the worker is
    /// forced to `Errored` and resources released best-effort.
    #[error("[Orchestrator] Stop of '{key}' not confirmed within {timeout_ms}ms")]
    StopTimeout {
        /// Key of the worker that failed to confirm.
        key: WorkerKey,
        /// Timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// Startup did not leave `Starting` within the bound.
    #[error("[Orchestrator] Start of '{key}' not confirmed within {timeout_ms}ms")]
    StartTimeout {
        /// Key of the worker that failed to confirm.
        key: WorkerKey,
        /// Timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// No record exists for the key.
    #[error("[Orchestrator] Worker not found: {key}")]
    WorkerNotFound {
        /// The missing key.
        key: WorkerKey,
    },

    /// Worker is already started; one live execution per key.
    #[error("[Orchestrator] Worker already started: {key}")]
    AlreadyStarted {
        /// The key in question.
        key: WorkerKey,
    },

    /// The desired-spec source failed; escalated to the operator.
    #[error("[Orchestrator] Spec source failure: {reason}")]
    SpecSource {
        /// Why the source failed.
        reason: String,
    },
}

impl OrchestratorError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::SpecSource { .. } => ErrorSeverity::Fatal,
            Self::StopTimeout { .. } | Self::StartTimeout { .. } => ErrorSeverity::Recoverable,
            Self::UnknownStrategy { .. }
            | Self::UnknownEngine { .. }
            | Self::WorkerNotFound { .. }
            | Self::AlreadyStarted { .. } => ErrorSeverity::Warning,
        }
    }
}
