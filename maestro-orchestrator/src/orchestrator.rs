//! Reconciliation of running workers against desired specs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{watch, Mutex as TokioMutex};
use tracing::{error, info, warn};

use maestro_core::config::ManagerConfig;
use maestro_core::error::{MaestroError, OrchestratorError};
use maestro_core::types::{WorkerKey, WorkerSpec, WorkerState};
use maestro_stream::LogBroadcastChannel;
use maestro_worker::{
    EngineRegistry, NullPersister, StatePersister, StrategyRegistry, WorkerHandle, WorkerLogger,
};

use crate::source::SpecSource;
use crate::status::{OrchestratorStatus, WorkerStatus};

/// Everything the orchestrator retains about one worker.
///
/// Replaced wholesale on restart; handles are one-shot.
pub struct WorkerRecord {
    /// The desired spec this worker was created from.
    pub spec: WorkerSpec,
    /// Lifecycle handle for the live (or finished) execution.
    pub handle: Arc<WorkerHandle>,
    /// The worker's log broadcast channel.
    pub channel: LogBroadcastChannel,
}

/// Outcome counts of one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Workers newly created and started.
    pub started: usize,
    /// Workers stopped and evicted (absent or disabled in the snapshot).
    pub stopped: usize,
    /// Workers destroyed and recreated due to a material spec change.
    pub replaced: usize,
    /// Workers left untouched.
    pub unchanged: usize,
    /// Create or replace attempts that failed.
    pub failed: usize,
    /// Snapshot entries skipped as invalid.
    pub invalid: usize,
}

/// Supervises one worker per key and converges the running set toward
/// the desired snapshot.
///
/// Every mutation of a key's record happens under that key's lock;
/// operations on different keys proceed independently.
pub struct Orchestrator {
    config: ManagerConfig,
    strategies: Arc<StrategyRegistry>,
    engines: Arc<EngineRegistry>,
    persister: Arc<dyn StatePersister>,
    records: DashMap<WorkerKey, Arc<WorkerRecord>>,
    // Locks are never removed; a stale lock for an evicted key is
    // cheaper than racing removal against acquisition.
    key_locks: DashMap<WorkerKey, Arc<TokioMutex<()>>>,
}

impl Orchestrator {
    /// Creates an orchestrator with explicit collaborators.
    #[must_use]
    pub fn new(
        config: ManagerConfig,
        strategies: Arc<StrategyRegistry>,
        engines: Arc<EngineRegistry>,
        persister: Arc<dyn StatePersister>,
    ) -> Self {
        Self {
            config,
            strategies,
            engines,
            persister,
            records: DashMap::new(),
            key_locks: DashMap::new(),
        }
    }

    /// Creates an orchestrator with the stock registries and no state
    /// persistence.
    #[must_use]
    pub fn with_defaults(config: ManagerConfig) -> Self {
        Self::new(
            config,
            Arc::new(StrategyRegistry::with_defaults()),
            Arc::new(EngineRegistry::with_defaults()),
            Arc::new(NullPersister),
        )
    }

    /// The configuration this orchestrator runs with.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    fn key_lock(&self, key: &WorkerKey) -> Arc<TokioMutex<()>> {
        Arc::clone(
            &self
                .key_locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(TokioMutex::new(()))),
        )
    }

    fn record(&self, key: &WorkerKey) -> Option<Arc<WorkerRecord>> {
        self.records.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Keys of every retained worker record.
    #[must_use]
    pub fn worker_keys(&self) -> Vec<WorkerKey> {
        self.records.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Retained spec for a key, if a record exists.
    #[must_use]
    pub fn spec_for(&self, key: &WorkerKey) -> Option<WorkerSpec> {
        self.record(key).map(|record| record.spec.clone())
    }

    /// Current state of a worker, if a record exists.
    #[must_use]
    pub fn worker_state(&self, key: &WorkerKey) -> Option<WorkerState> {
        self.record(key).map(|record| record.handle.state())
    }

    /// Converges the running set toward `desired`.
    ///
    /// Absent or disabled keys are stopped and evicted; new keys are
    /// created and started; materially changed specs are destroyed and
    /// recreated; unchanged specs are untouched. Per-entry failures are
    /// logged and counted, never fatal to the pass.
    pub async fn reconcile(&self, desired: &[WorkerSpec]) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        let mut desired_map: HashMap<WorkerKey, &WorkerSpec> = HashMap::new();
        for spec in desired {
            if !spec.is_valid() {
                warn!(target: "maestro::orchestrator", strategy = %spec.strategy_key, "invalid spec skipped");
                summary.invalid += 1;
                continue;
            }
            if !spec.enabled {
                continue;
            }
            let key = spec.key();
            if desired_map.insert(key.clone(), spec).is_some() {
                warn!(target: "maestro::orchestrator", worker = %key, "duplicate spec; last entry wins");
            }
        }

        for (key, spec) in &desired_map {
            let lock = self.key_lock(key);
            let _guard = lock.lock().await;
            match self.record(key) {
                None => match self.create_and_start_locked((*spec).clone()).await {
                    Ok(()) => summary.started += 1,
                    Err(e) => {
                        warn!(target: "maestro::orchestrator", worker = %key, error = %e, "create failed");
                        summary.failed += 1;
                    }
                },
                Some(record) if spec.requires_restart(&record.spec) => {
                    info!(target: "maestro::orchestrator", worker = %key, "spec changed, replacing worker");
                    self.destroy_locked(key).await;
                    match self.create_and_start_locked((*spec).clone()).await {
                        Ok(()) => summary.replaced += 1,
                        Err(e) => {
                            warn!(target: "maestro::orchestrator", worker = %key, error = %e, "replace failed");
                            summary.failed += 1;
                        }
                    }
                }
                Some(_) => summary.unchanged += 1,
            }
        }

        let stale: Vec<WorkerKey> = self
            .records
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| !desired_map.contains_key(key))
            .collect();
        for key in stale {
            let lock = self.key_lock(&key);
            let _guard = lock.lock().await;
            if self.destroy_locked(&key).await.is_some() {
                summary.stopped += 1;
            }
        }

        summary
    }

    /// Builds, registers, and starts a worker. Caller holds the key
    /// lock.
    ///
    /// A worker whose init fails stays registered in `Errored` with its
    /// last error visible; resolution failures register nothing.
    async fn create_and_start_locked(&self, spec: WorkerSpec) -> Result<(), MaestroError> {
        let key = spec.key();
        let class = match spec.engine_class.clone() {
            Some(class) => class,
            None => self.strategies.resolve(&spec.strategy_key).ok_or_else(|| {
                OrchestratorError::UnknownStrategy {
                    strategy: spec.strategy_key.clone(),
                }
            })?,
        };
        let factory =
            self.engines
                .resolve(spec.engine)
                .ok_or_else(|| OrchestratorError::UnknownEngine {
                    engine: spec.engine.to_string(),
                })?;

        let (logger, feed_rx) = WorkerLogger::new(key.clone());
        let channel =
            LogBroadcastChannel::bind(key.clone(), feed_rx, &self.config.stream).await?;
        let handle = factory(&spec, &class, logger, Arc::clone(&self.persister))?;
        let record = Arc::new(WorkerRecord {
            spec,
            handle: Arc::new(handle),
            channel,
        });
        self.records.insert(key.clone(), Arc::clone(&record));

        // Channel lifetime is bounded by the worker's: close it the
        // moment the worker lands in a terminal state, whether through
        // an orchestrated stop, an init failure, or a crash mid-run.
        {
            let record = Arc::clone(&record);
            tokio::spawn(async move {
                record.handle.terminal().await;
                record.channel.close();
            });
        }

        match record.handle.start(self.config.start_timeout()).await {
            Ok(()) => {
                info!(target: "maestro::orchestrator", worker = %key, url = record.channel.url(), "worker started");
                Ok(())
            }
            Err(e) => {
                // Record stays visible so operators can see the failure.
                warn!(target: "maestro::orchestrator", worker = %key, error = %e, "worker failed to start");
                Err(e)
            }
        }
    }

    /// Stops, closes, and evicts a worker. Caller holds the key lock.
    ///
    /// Returns the final state, or `None` when no record existed.
    async fn destroy_locked(&self, key: &WorkerKey) -> Option<WorkerState> {
        let record = self.record(key)?;
        record.handle.stop(true);
        let final_state = match record.handle.wait_terminal(self.config.stop_timeout()).await {
            Ok(state) => state,
            Err(e) => {
                warn!(target: "maestro::orchestrator", worker = %key, error = %e, "forcing errored");
                record.handle.force_errored("stop not confirmed within bound");
                WorkerState::Errored
            }
        };
        record.channel.close();
        self.records.remove(key);
        info!(target: "maestro::orchestrator", worker = %key, state = %final_state, "worker destroyed");
        Some(final_state)
    }

    /// Stops a worker but keeps its record for a later restart.
    ///
    /// Idempotent: a worker already terminal reports its state.
    ///
    /// # Errors
    ///
    /// `WorkerNotFound` for an unknown key; `StopTimeout` after forcing
    /// the worker to `Errored`.
    pub async fn stop_worker(
        &self,
        key: &WorkerKey,
        persist: bool,
    ) -> Result<WorkerState, MaestroError> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;
        self.stop_worker_locked(key, persist).await
    }

    /// `stop_worker`, skipping (returning `None`) when the key lock is
    /// contended by another lifecycle operation.
    pub async fn try_stop_worker(
        &self,
        key: &WorkerKey,
        persist: bool,
    ) -> Result<Option<WorkerState>, MaestroError> {
        let lock = self.key_lock(key);
        let Ok(_guard) = lock.try_lock_owned() else {
            return Ok(None);
        };
        self.stop_worker_locked(key, persist).await.map(Some)
    }

    async fn stop_worker_locked(
        &self,
        key: &WorkerKey,
        persist: bool,
    ) -> Result<WorkerState, MaestroError> {
        let record = self
            .record(key)
            .ok_or_else(|| OrchestratorError::WorkerNotFound { key: key.clone() })?;
        let state = record.handle.state();
        if state.is_terminal() {
            record.channel.close();
            return Ok(state);
        }
        record.handle.stop(persist);
        match record.handle.wait_terminal(self.config.stop_timeout()).await {
            Ok(final_state) => {
                record.channel.close();
                info!(target: "maestro::orchestrator", worker = %key, state = %final_state, "worker stopped");
                Ok(final_state)
            }
            Err(e) => {
                record.handle.force_errored("stop not confirmed within bound");
                record.channel.close();
                Err(e.into())
            }
        }
    }

    /// Restarts a stopped worker from its retained spec, with a fresh
    /// channel and handle.
    ///
    /// # Errors
    ///
    /// `WorkerNotFound` for an unknown key; `AlreadyStarted` when the
    /// worker is `Starting` or `Running`.
    pub async fn start_worker(&self, key: &WorkerKey) -> Result<(), MaestroError> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;
        self.start_worker_locked(key).await
    }

    /// `start_worker`, skipping (returning `false`) when the key lock
    /// is contended.
    pub async fn try_start_worker(&self, key: &WorkerKey) -> Result<bool, MaestroError> {
        let lock = self.key_lock(key);
        let Ok(_guard) = lock.try_lock_owned() else {
            return Ok(false);
        };
        self.start_worker_locked(key).await.map(|()| true)
    }

    async fn start_worker_locked(&self, key: &WorkerKey) -> Result<(), MaestroError> {
        let record = self
            .record(key)
            .ok_or_else(|| OrchestratorError::WorkerNotFound { key: key.clone() })?;
        if record.handle.state().is_active() {
            return Err(OrchestratorError::AlreadyStarted { key: key.clone() }.into());
        }
        record.channel.close();
        self.create_and_start_locked(record.spec.clone()).await
    }

    /// Builds a status snapshot without blocking on in-flight lifecycle
    /// operations.
    #[must_use]
    pub fn get_status(&self) -> OrchestratorStatus {
        let mut workers = BTreeMap::new();
        let mut active = 0;
        let mut errored = 0;
        for entry in self.records.iter() {
            let record = entry.value();
            let state = record.handle.state();
            if state.is_active() {
                active += 1;
            }
            if state == WorkerState::Errored {
                errored += 1;
            }
            workers.insert(
                entry.key().to_string(),
                WorkerStatus {
                    alive: record.handle.is_alive(),
                    state,
                    last_error: record.handle.last_error(),
                    stats: record.handle.stats(),
                    log_stream_url: record.channel.url().to_string(),
                    last_transition: record.handle.last_transition(),
                },
            );
        }
        OrchestratorStatus {
            total_workers: workers.len(),
            active,
            errored,
            workers,
        }
    }

    /// Reconciliation loop: pull a snapshot from `source` on the reload
    /// cadence until `shutdown_rx` flips, then drain every worker.
    ///
    /// A failing source is logged and retried on the next cycle; the
    /// current workers keep running.
    pub async fn run(&self, source: Arc<dyn SpecSource>, mut shutdown_rx: watch::Receiver<bool>) {
        self.reload_from(source.as_ref()).await;

        if let Some(interval) = self.config.reload_interval() {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => self.reload_from(source.as_ref()).await,
                }
            }
        } else {
            let _ = shutdown_rx.changed().await;
        }

        info!(target: "maestro::orchestrator", "shutting down, draining workers");
        self.shutdown().await;
    }

    async fn reload_from(&self, source: &dyn SpecSource) {
        match source.load().await {
            Ok(specs) => {
                let summary = self.reconcile(&specs).await;
                info!(target: "maestro::orchestrator", ?summary, "reconciled");
            }
            Err(e) => {
                error!(target: "maestro::orchestrator", error = %e, "spec source failed, keeping current workers");
            }
        }
    }

    /// Stops and evicts every worker.
    pub async fn shutdown(&self) {
        for key in self.worker_keys() {
            let lock = self.key_lock(&key);
            let _guard = lock.lock().await;
            self.destroy_locked(&key).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    use maestro_core::types::{EngineKind, Symbol};

    fn test_config() -> ManagerConfig {
        ManagerConfig {
            reload_interval_secs: 0,
            start_timeout_secs: 5,
            stop_timeout_secs: 2,
            ..Default::default()
        }
    }

    fn spec(symbol: &str, strategy: &str, params: serde_json::Value) -> WorkerSpec {
        let mut params = params.as_object().cloned().unwrap_or_default();
        params
            .entry("poll_interval_ms".to_string())
            .or_insert(json!(10));
        WorkerSpec {
            owner_id: Some("u1".to_string()),
            symbol: Symbol::new_unchecked(symbol),
            strategy_key: strategy.to_string(),
            enabled: true,
            engine: EngineKind::Sim,
            engine_class: None,
            params,
        }
    }

    #[tokio::test]
    async fn test_reconcile_creates_then_noop() {
        let orch = Orchestrator::with_defaults(test_config());
        let desired = vec![
            spec("002050.SZ", "hidden_dragon", json!({})),
            spec("600519.SH", "turtle", json!({})),
        ];

        let summary = orch.reconcile(&desired).await;
        assert_eq!(summary.started, 2);
        assert_eq!(summary.failed, 0);

        let status = orch.get_status();
        assert_eq!(status.total_workers, 2);
        assert_eq!(status.active, 2);
        let url_before = status.workers["u1:002050.SZ:hidden_dragon"]
            .log_stream_url
            .clone();

        // Same snapshot again: strict no-op.
        let summary = orch.reconcile(&desired).await;
        assert_eq!(summary.unchanged, 2);
        assert_eq!(summary.started + summary.replaced + summary.stopped, 0);
        let status = orch.get_status();
        assert_eq!(
            status.workers["u1:002050.SZ:hidden_dragon"].log_stream_url,
            url_before
        );

        orch.shutdown().await;
        assert_eq!(orch.get_status().total_workers, 0);
    }

    #[tokio::test]
    async fn test_param_change_replaces_exactly_one() {
        let orch = Orchestrator::with_defaults(test_config());
        let a = spec("002050.SZ", "hidden_dragon", json!({"window": 20}));
        let b = spec("600519.SH", "turtle", json!({}));
        orch.reconcile(&[a.clone(), b.clone()]).await;

        let before = orch.get_status();
        let turtle_url = before.workers["u1:600519.SH:turtle"].log_stream_url.clone();
        let dragon_url = before.workers["u1:002050.SZ:hidden_dragon"]
            .log_stream_url
            .clone();

        let a2 = spec("002050.SZ", "hidden_dragon", json!({"window": 30}));
        let summary = orch.reconcile(&[a2, b]).await;
        assert_eq!(summary.replaced, 1);
        assert_eq!(summary.unchanged, 1);

        let after = orch.get_status();
        // The changed worker got a fresh channel; the other kept its own.
        assert_ne!(
            after.workers["u1:002050.SZ:hidden_dragon"].log_stream_url,
            dragon_url
        );
        assert_eq!(after.workers["u1:600519.SH:turtle"].log_stream_url, turtle_url);
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_disabled_spec_evicts_worker() {
        let orch = Orchestrator::with_defaults(test_config());
        let mut s = spec("002050.SZ", "hidden_dragon", json!({}));
        orch.reconcile(std::slice::from_ref(&s)).await;
        assert_eq!(orch.get_status().total_workers, 1);

        s.enabled = false;
        let summary = orch.reconcile(&[s]).await;
        assert_eq!(summary.stopped, 1);
        assert_eq!(orch.get_status().total_workers, 0);
    }

    #[tokio::test]
    async fn test_unknown_strategy_skipped_others_unaffected() {
        let orch = Orchestrator::with_defaults(test_config());
        let good = spec("002050.SZ", "hidden_dragon", json!({}));
        let bad = spec("600519.SH", "no_such_strategy", json!({}));

        let summary = orch.reconcile(&[good, bad]).await;
        assert_eq!(summary.started, 1);
        assert_eq!(summary.failed, 1);
        let status = orch.get_status();
        assert_eq!(status.total_workers, 1);
        assert!(status.workers.contains_key("u1:002050.SZ:hidden_dragon"));
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_legacy_engine_class_bypasses_registry() {
        let orch = Orchestrator::with_defaults(test_config());
        let mut s = spec("002050.SZ", "unregistered_strategy", json!({}));
        s.engine_class = Some("scripts.single_stream.Engine".to_string());

        let summary = orch.reconcile(std::slice::from_ref(&s)).await;
        assert_eq!(summary.started, 1);
        let status = orch.get_status();
        let stats = &status.workers["u1:002050.SZ:unregistered_strategy"].stats;
        assert_eq!(stats["class"], json!("scripts.single_stream.Engine"));
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_init_failure_leaves_visible_errored_record() {
        let orch = Orchestrator::with_defaults(test_config());
        let s = spec("002050.SZ", "hidden_dragon", json!({"fail_init": true}));

        let summary = orch.reconcile(std::slice::from_ref(&s)).await;
        assert_eq!(summary.failed, 1);
        let status = orch.get_status();
        assert_eq!(status.total_workers, 1);
        assert_eq!(status.errored, 1);
        let worker = &status.workers["u1:002050.SZ:hidden_dragon"];
        assert_eq!(worker.state, WorkerState::Errored);
        assert!(worker.last_error.as_deref().unwrap().contains("fail_init"));
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_errored_worker_channel_refuses_observers() {
        let orch = Orchestrator::with_defaults(test_config());
        let s = spec("002050.SZ", "hidden_dragon", json!({"fail_init": true}));
        orch.reconcile(std::slice::from_ref(&s)).await;

        let status = orch.get_status();
        let worker = &status.workers["u1:002050.SZ:hidden_dragon"];
        assert_eq!(worker.state, WorkerState::Errored);

        // Channel close follows the terminal transition asynchronously.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let refused =
            tokio_tungstenite::connect_async(worker.log_stream_url.as_str()).await;
        assert!(refused.is_err(), "errored worker still accepts observers");
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_stopped_worker_channel_refuses_observers() {
        let orch = Orchestrator::with_defaults(test_config());
        let s = spec("002050.SZ", "hidden_dragon", json!({}));
        let key = s.key();
        orch.reconcile(std::slice::from_ref(&s)).await;

        orch.stop_worker(&key, true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let url = orch.get_status().workers[key.as_str()].log_stream_url.clone();
        let refused = tokio_tungstenite::connect_async(url.as_str()).await;
        assert!(refused.is_err(), "stopped worker still accepts observers");
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_then_restart_single_worker() {
        let orch = Orchestrator::with_defaults(test_config());
        let s = spec("002050.SZ", "hidden_dragon", json!({}));
        let key = s.key();
        orch.reconcile(std::slice::from_ref(&s)).await;

        let state = orch.stop_worker(&key, true).await.unwrap();
        assert_eq!(state, WorkerState::Stopped);
        // Idempotent on a terminal worker.
        let state = orch.stop_worker(&key, true).await.unwrap();
        assert_eq!(state, WorkerState::Stopped);
        assert_eq!(orch.get_status().total_workers, 1);

        orch.start_worker(&key).await.unwrap();
        let status = orch.get_status();
        assert_eq!(status.workers[key.as_str()].state, WorkerState::Running);

        let err = orch.start_worker(&key).await.unwrap_err();
        assert!(err.to_string().contains("already started"));
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_unknown_worker() {
        let orch = Orchestrator::with_defaults(test_config());
        let key = WorkerKey::new(None, &Symbol::new_unchecked("ZZZ"), "ghost");
        let err = orch.stop_worker(&key, false).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_concurrent_reconciles_converge_to_one_worker() {
        let orch = Arc::new(Orchestrator::with_defaults(test_config()));
        let desired = vec![spec("002050.SZ", "hidden_dragon", json!({}))];

        let a = {
            let orch = Arc::clone(&orch);
            let desired = desired.clone();
            tokio::spawn(async move { orch.reconcile(&desired).await })
        };
        let b = {
            let orch = Arc::clone(&orch);
            let desired = desired.clone();
            tokio::spawn(async move { orch.reconcile(&desired).await })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert_eq!(a.started + b.started, 1);
        assert_eq!(a.unchanged + b.unchanged, 1);
        let status = orch.get_status();
        assert_eq!(status.total_workers, 1);
        assert_eq!(status.active, 1);
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_try_stop_skips_when_contended() {
        let orch = Arc::new(Orchestrator::with_defaults(test_config()));
        let s = spec("002050.SZ", "hidden_dragon", json!({}));
        let key = s.key();
        orch.reconcile(std::slice::from_ref(&s)).await;

        let lock = orch.key_lock(&key);
        let guard = lock.lock().await;
        let skipped = orch.try_stop_worker(&key, true).await.unwrap();
        assert!(skipped.is_none());
        drop(guard);

        let state = orch.try_stop_worker(&key, true).await.unwrap();
        assert_eq!(state, Some(WorkerState::Stopped));
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_run_loop_drains_on_shutdown() {
        let orch = Arc::new(Orchestrator::with_defaults(test_config()));
        let source = Arc::new(crate::source::StaticSource::new(vec![spec(
            "002050.SZ",
            "hidden_dragon",
            json!({}),
        )]));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.run(source, shutdown_rx).await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(orch.get_status().active, 1);

        shutdown_tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(orch.get_status().total_workers, 0);
    }
}
