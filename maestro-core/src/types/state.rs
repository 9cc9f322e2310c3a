//! Worker lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a worker.
///
/// Normal progression is `Created → Starting → Running → Stopping →
/// Stopped`. `Errored` is reachable from `Starting` and `Running` when the
/// engine fails to initialize, panics, or cannot confirm shutdown in time.
///
/// `Stopped` and `Errored` are terminal: no state is reachable from them
/// except `Starting` via a fresh create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Worker exists but has not been started.
    Created,
    /// Engine initialization is in progress.
    Starting,
    /// Engine main loop is executing.
    Running,
    /// Cooperative shutdown is in progress.
    Stopping,
    /// Worker has fully wound down.
    Stopped,
    /// Worker failed; see the record's last error.
    Errored,
}

impl WorkerState {
    /// Returns true for `Stopped` and `Errored`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Errored)
    }

    /// Returns true for `Starting` and `Running`.
    ///
    /// Active workers are the ones the scheduler must not start again.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    /// Returns the state as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(WorkerState::Stopped.is_terminal());
        assert!(WorkerState::Errored.is_terminal());
        assert!(!WorkerState::Running.is_terminal());
        assert!(!WorkerState::Stopping.is_terminal());
    }

    #[test]
    fn test_active_states() {
        assert!(WorkerState::Starting.is_active());
        assert!(WorkerState::Running.is_active());
        assert!(!WorkerState::Created.is_active());
        assert!(!WorkerState::Stopped.is_active());
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&WorkerState::Running).unwrap(),
            "\"running\""
        );
        assert_eq!(WorkerState::Errored.to_string(), "errored");
    }
}
