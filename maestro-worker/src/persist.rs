//! Worker state persistence.
//!
//! A graceful stop with `persist_state` set saves the engine's state
//! through this collaborator before the worker reports `Stopped`.

use std::path::PathBuf;

use async_trait::async_trait;

use maestro_core::error::EngineError;
use maestro_core::types::WorkerKey;

/// Saves and restores engine state keyed by worker identity.
#[async_trait]
pub trait StatePersister: Send + Sync + 'static {
    /// Durably saves `state` for `key`, replacing any previous save.
    async fn save(&self, key: &WorkerKey, state: &serde_json::Value) -> Result<(), EngineError>;

    /// Loads the last saved state for `key`, if any.
    async fn load(&self, key: &WorkerKey) -> Result<Option<serde_json::Value>, EngineError>;

    /// Removes any saved state for `key`.
    async fn remove(&self, key: &WorkerKey) -> Result<(), EngineError>;
}

/// Persister that stores nothing. Used when state survival is not
/// wanted, and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPersister;

#[async_trait]
impl StatePersister for NullPersister {
    async fn save(&self, _key: &WorkerKey, _state: &serde_json::Value) -> Result<(), EngineError> {
        Ok(())
    }

    async fn load(&self, _key: &WorkerKey) -> Result<Option<serde_json::Value>, EngineError> {
        Ok(None)
    }

    async fn remove(&self, _key: &WorkerKey) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Persister backed by one JSON file per worker key.
#[derive(Debug, Clone)]
pub struct JsonFilePersister {
    dir: PathBuf,
}

impl JsonFilePersister {
    /// Creates a persister rooted at `dir`. The directory is created on
    /// first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &WorkerKey) -> PathBuf {
        // Keys contain ':' which is unfriendly to some filesystems.
        let name: String = key
            .as_str()
            .chars()
            .map(|c| if c == ':' || c == '/' { '_' } else { c })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl StatePersister for JsonFilePersister {
    async fn save(&self, key: &WorkerKey, state: &serde_json::Value) -> Result<(), EngineError> {
        let path = self.path_for(key);
        let dir = self.dir.clone();
        let payload =
            serde_json::to_vec_pretty(state).map_err(|e| EngineError::PersistFailed {
                reason: e.to_string(),
            })?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| EngineError::PersistFailed {
                reason: e.to_string(),
            })?;
        tokio::fs::write(&path, payload)
            .await
            .map_err(|e| EngineError::PersistFailed {
                reason: format!("write {}: {e}", path.display()),
            })
    }

    async fn load(&self, key: &WorkerKey) -> Result<Option<serde_json::Value>, EngineError> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| EngineError::PersistFailed {
                    reason: format!("parse {}: {e}", path.display()),
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EngineError::PersistFailed {
                reason: format!("read {}: {e}", path.display()),
            }),
        }
    }

    async fn remove(&self, key: &WorkerKey) -> Result<(), EngineError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::PersistFailed {
                reason: format!("remove {}: {e}", path.display()),
            }),
        }
    }
}
