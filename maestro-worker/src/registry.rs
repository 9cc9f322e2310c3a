//! Strategy and engine registries.
//!
//! Two lookups happen when a worker is created: the strategy registry
//! maps a user-facing strategy identifier to an engine class path, and
//! the engine registry maps an engine kind to the factory that builds a
//! ready-to-start [`WorkerHandle`].

use std::sync::Arc;

use dashmap::DashMap;

use maestro_core::error::EngineError;
use maestro_core::types::{EngineKind, WorkerSpec};

use crate::adapters::{ReplayEngine, SimEngine};
use crate::engine::EngineContext;
use crate::handle::WorkerHandle;
use crate::logger::WorkerLogger;
use crate::persist::StatePersister;

/// Builds a ready-to-start worker from a resolved spec.
pub type WorkerFactory = Arc<
    dyn Fn(
            &WorkerSpec,
            &str,
            WorkerLogger,
            Arc<dyn StatePersister>,
        ) -> Result<WorkerHandle, EngineError>
        + Send
        + Sync,
>;

/// Maps strategy identifiers to engine class paths.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    entries: DashMap<String, String>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry preloaded with the stock strategies.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register("hidden_dragon", "sim.momentum");
        registry.register("single_yang", "sim.momentum");
        registry.register("turtle", "sim.breakout");
        registry.register("grid", "sim.grid");
        registry.register("tape", "replay.ticks");
        registry
    }

    /// Registers (or replaces) a strategy mapping.
    pub fn register(&self, strategy_key: impl Into<String>, class: impl Into<String>) {
        self.entries.insert(strategy_key.into(), class.into());
    }

    /// Resolves a strategy identifier to its engine class path.
    #[must_use]
    pub fn resolve(&self, strategy_key: &str) -> Option<String> {
        self.entries.get(strategy_key).map(|e| e.value().clone())
    }

    /// Whether the identifier is registered.
    #[must_use]
    pub fn contains(&self, strategy_key: &str) -> bool {
        self.entries.contains_key(strategy_key)
    }

    /// All registered strategy identifiers.
    #[must_use]
    pub fn strategies(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

/// Maps engine kinds to worker factories.
#[derive(Default)]
pub struct EngineRegistry {
    factories: DashMap<EngineKind, WorkerFactory>,
}

impl EngineRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with factories for the built-in adapters.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(
            EngineKind::Sim,
            Arc::new(|spec, class, logger, persister| {
                let engine = SimEngine::new(spec.key().as_str(), class, &spec.params);
                let ctx =
                    EngineContext::new(spec.key(), spec.params.clone(), logger, persister);
                Ok(WorkerHandle::new(Box::new(engine), ctx))
            }),
        );
        registry.register(
            EngineKind::Replay,
            Arc::new(|spec, class, logger, persister| {
                let engine = ReplayEngine::new(class, &spec.params);
                let ctx =
                    EngineContext::new(spec.key(), spec.params.clone(), logger, persister);
                Ok(WorkerHandle::new(Box::new(engine), ctx))
            }),
        );
        registry
    }

    /// Registers (or replaces) the factory for an engine kind.
    pub fn register(&self, kind: EngineKind, factory: WorkerFactory) {
        self.factories.insert(kind, factory);
    }

    /// Resolves the factory for an engine kind.
    #[must_use]
    pub fn resolve(&self, kind: EngineKind) -> Option<WorkerFactory> {
        self.factories.get(&kind).map(|e| Arc::clone(e.value()))
    }

    /// All engine kinds with a registered factory.
    #[must_use]
    pub fn kinds(&self) -> Vec<EngineKind> {
        self.factories.iter().map(|e| *e.key()).collect()
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
