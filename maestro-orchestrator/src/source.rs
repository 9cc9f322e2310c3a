//! Desired-spec snapshot sources.

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::warn;

use maestro_core::error::OrchestratorError;
use maestro_core::types::WorkerSpec;

/// Supplies read-only desired-state snapshots.
#[async_trait]
pub trait SpecSource: Send + Sync + 'static {
    /// Loads the current desired snapshot.
    ///
    /// # Errors
    ///
    /// `OrchestratorError::SpecSource` when the snapshot cannot be
    /// produced at all. Individually malformed entries are skipped with
    /// a warning instead.
    async fn load(&self) -> Result<Vec<WorkerSpec>, OrchestratorError>;
}

/// Source backed by a JSON file holding an array of worker specs.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Creates a source reading from `path` on every load.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SpecSource for JsonFileSource {
    async fn load(&self) -> Result<Vec<WorkerSpec>, OrchestratorError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| OrchestratorError::SpecSource {
                reason: format!("read {}: {e}", self.path.display()),
            })?;
        let entries: Vec<serde_json::Value> =
            serde_json::from_str(&contents).map_err(|e| OrchestratorError::SpecSource {
                reason: format!("parse {}: {e}", self.path.display()),
            })?;

        let mut specs = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<WorkerSpec>(entry) {
                Ok(spec) if spec.is_valid() => specs.push(spec),
                Ok(spec) => {
                    warn!(target: "maestro::source", index, key = %spec.key(), "invalid spec entry skipped");
                }
                Err(e) => {
                    warn!(target: "maestro::source", index, error = %e, "malformed spec entry skipped");
                }
            }
        }
        Ok(specs)
    }
}

/// In-memory source whose snapshot can be swapped at runtime. Used in
/// tests and embedded setups.
#[derive(Debug, Default)]
pub struct StaticSource {
    specs: Mutex<Vec<WorkerSpec>>,
}

impl StaticSource {
    /// Creates a source holding `specs`.
    #[must_use]
    pub fn new(specs: Vec<WorkerSpec>) -> Self {
        Self {
            specs: Mutex::new(specs),
        }
    }

    /// Replaces the snapshot returned by subsequent loads.
    pub fn set(&self, specs: Vec<WorkerSpec>) {
        *self.specs.lock() = specs;
    }
}

#[async_trait]
impl SpecSource for StaticSource {
    async fn load(&self) -> Result<Vec<WorkerSpec>, OrchestratorError> {
        Ok(self.specs.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_json_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"owner_id": "u1", "symbol": "002050.SZ", "strategy_key": "hidden_dragon"}},
                {{"symbol": "600519.SH", "strategy_key": "turtle", "engine": "replay"}}
            ]"#
        )
        .unwrap();
        let source = JsonFileSource::new(file.path());
        let specs = source.load().await.unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].key().as_str(), "u1:002050.SZ:hidden_dragon");
    }

    #[tokio::test]
    async fn test_malformed_entries_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"symbol": "002050.SZ", "strategy_key": "hidden_dragon"}},
                {{"symbol": "002050.SZ"}},
                {{"symbol": "600519.SH", "strategy_key": ""}}
            ]"#
        )
        .unwrap();
        let source = JsonFileSource::new(file.path());
        let specs = source.load().await.unwrap();
        assert_eq!(specs.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_source_error() {
        let source = JsonFileSource::new("/nonexistent/workers.json");
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::SpecSource { .. }));
    }

    #[tokio::test]
    async fn test_static_source_swap() {
        let source = StaticSource::default();
        assert!(source.load().await.unwrap().is_empty());
        source.set(vec![WorkerSpec {
            owner_id: None,
            symbol: maestro_core::types::Symbol::new_unchecked("ABC"),
            strategy_key: "grid".to_string(),
            enabled: true,
            engine: maestro_core::types::EngineKind::Sim,
            engine_class: None,
            params: serde_json::Map::new(),
        }]);
        assert_eq!(source.load().await.unwrap().len(), 1);
    }
}
