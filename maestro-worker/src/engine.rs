//! The strategy engine contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use maestro_core::error::EngineError;
use maestro_core::types::WorkerKey;

use crate::logger::WorkerLogger;
use crate::persist::StatePersister;

/// Engine statistics as a JSON object.
pub type Stats = serde_json::Map<String, serde_json::Value>;

/// Everything an engine needs from its surroundings.
///
/// Owned by the worker task and passed by reference into each engine
/// call; engines never outlive their context.
#[derive(Clone)]
pub struct EngineContext {
    key: WorkerKey,
    params: Stats,
    logger: WorkerLogger,
    persister: Arc<dyn StatePersister>,
}

impl EngineContext {
    /// Creates a context for one worker.
    #[must_use]
    pub fn new(
        key: WorkerKey,
        params: Stats,
        logger: WorkerLogger,
        persister: Arc<dyn StatePersister>,
    ) -> Self {
        Self {
            key,
            params,
            logger,
            persister,
        }
    }

    /// Identity of the worker this engine runs under.
    #[must_use]
    pub fn key(&self) -> &WorkerKey {
        &self.key
    }

    /// Engine-specific parameters from the desired spec.
    #[must_use]
    pub fn params(&self) -> &Stats {
        &self.params
    }

    /// Looks up a single parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&serde_json::Value> {
        self.params.get(name)
    }

    /// Looks up a boolean parameter, defaulting when absent or mistyped.
    #[must_use]
    pub fn param_bool(&self, name: &str, default: bool) -> bool {
        self.param(name).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    /// Looks up an integer parameter, defaulting when absent or mistyped.
    #[must_use]
    pub fn param_u64(&self, name: &str, default: u64) -> u64 {
        self.param(name).and_then(|v| v.as_u64()).unwrap_or(default)
    }

    /// Looks up a float parameter, defaulting when absent or mistyped.
    #[must_use]
    pub fn param_f64(&self, name: &str, default: f64) -> f64 {
        self.param(name).and_then(|v| v.as_f64()).unwrap_or(default)
    }

    /// The worker's log emitter.
    #[must_use]
    pub fn log(&self) -> &WorkerLogger {
        &self.logger
    }

    /// The state persistence collaborator.
    #[must_use]
    pub fn persister(&self) -> &Arc<dyn StatePersister> {
        &self.persister
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// An execution engine adapter.
///
/// The worker harness calls `init` once, `poll` repeatedly while
/// running, and `shutdown` once on the way out. Panics in any of the
/// three are caught at the task boundary and force `Errored`; engines
/// should prefer returning `EngineError`.
#[async_trait]
pub trait StrategyEngine: Send + 'static {
    /// Short adapter name, e.g. "sim".
    fn name(&self) -> &str;

    /// Acquires resources and restores persisted state.
    async fn init(&mut self, ctx: &EngineContext) -> Result<(), EngineError>;

    /// One iteration of the engine's main loop.
    async fn poll(&mut self, ctx: &EngineContext) -> Result<(), EngineError>;

    /// Releases resources; saves state when `persist_state` is set.
    async fn shutdown(&mut self, ctx: &EngineContext, persist_state: bool)
        -> Result<(), EngineError>;

    /// Current statistics snapshot.
    fn stats(&self) -> Stats;

    /// Cadence of `poll` calls.
    fn poll_interval(&self) -> Duration {
        Duration::from_millis(250)
    }
}
