//! Status snapshot types.
//!
//! Serde types consumed by external tooling; building one never blocks
//! on in-flight lifecycle operations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use maestro_core::types::WorkerState;

/// Point-in-time view of one worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStatus {
    /// Whether the engine task exists and has not finished.
    pub alive: bool,
    /// Current lifecycle state.
    pub state: WorkerState,
    /// Last recorded error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Latest engine statistics snapshot.
    pub stats: serde_json::Map<String, serde_json::Value>,
    /// WebSocket URL of the worker's log stream.
    pub log_stream_url: String,
    /// Time of the most recent state transition.
    pub last_transition: DateTime<Utc>,
}

/// Aggregate view over every worker record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Number of worker records.
    pub total_workers: usize,
    /// Workers currently `Starting` or `Running`.
    pub active: usize,
    /// Workers in `Errored`.
    pub errored: usize,
    /// Per-key worker status, keyed by the worker key string.
    pub workers: BTreeMap<String, WorkerStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let status = WorkerStatus {
            alive: true,
            state: WorkerState::Running,
            last_error: None,
            stats: serde_json::Map::new(),
            log_stream_url: "ws://127.0.0.1:49152".to_string(),
            last_transition: Utc::now(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "running");
        assert_eq!(json["alive"], true);
        // Absent errors are omitted from the wire form.
        assert!(json.get("last_error").is_none());
    }
}
