//! Worker lifecycle harness.
//!
//! State machine:
//!
//! ```text
//! Created -> Starting -> Running -> Stopping -> Stopped
//!               |           |
//!               +--> Errored <--+
//! ```
//!
//! `Stopped` and `Errored` are terminal. A handle drives exactly one
//! engine run; restarting a worker means building a fresh handle.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use maestro_core::error::{EngineError, MaestroError, OrchestratorError};
use maestro_core::types::{WorkerKey, WorkerState};

use crate::engine::{EngineContext, Stats, StrategyEngine};

/// State shared between the handle and the engine task.
struct WorkerShared {
    key: WorkerKey,
    state_tx: watch::Sender<WorkerState>,
    last_error: RwLock<Option<String>>,
    stats: RwLock<Stats>,
    last_transition: RwLock<DateTime<Utc>>,
    persist_on_stop: AtomicBool,
}

impl WorkerShared {
    fn set_state(&self, state: WorkerState) {
        *self.last_transition.write() = Utc::now();
        self.state_tx.send_replace(state);
    }

    fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write() = Some(message.into());
    }

    fn put_stats(&self, stats: Stats) {
        *self.stats.write() = stats;
    }
}

/// Boot payload consumed by the first (and only) `start` call.
struct Boot {
    engine: Box<dyn StrategyEngine>,
    ctx: EngineContext,
    stop_rx: watch::Receiver<bool>,
}

/// Handle to one worker.
///
/// Cheap to share behind an `Arc`; all accessors are callable from any
/// task.
pub struct WorkerHandle {
    shared: Arc<WorkerShared>,
    stop_tx: watch::Sender<bool>,
    boot: Mutex<Option<Boot>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerHandle {
    /// Creates a worker in `Created`, ready to start.
    #[must_use]
    pub fn new(engine: Box<dyn StrategyEngine>, ctx: EngineContext) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, _) = watch::channel(WorkerState::Created);
        Self {
            shared: Arc::new(WorkerShared {
                key: ctx.key().clone(),
                state_tx,
                last_error: RwLock::new(None),
                stats: RwLock::new(Stats::new()),
                last_transition: RwLock::new(Utc::now()),
                persist_on_stop: AtomicBool::new(true),
            }),
            stop_tx,
            boot: Mutex::new(Some(Boot {
                engine,
                ctx,
                stop_rx,
            })),
            task: Mutex::new(None),
        }
    }

    /// Identity of this worker.
    #[must_use]
    pub fn key(&self) -> &WorkerKey {
        &self.shared.key
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        *self.shared.state_tx.borrow()
    }

    /// Last recorded error message, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error.read().clone()
    }

    /// Latest engine statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.shared.stats.read().clone()
    }

    /// Time of the most recent state transition.
    #[must_use]
    pub fn last_transition(&self) -> DateTime<Utc> {
        *self.shared.last_transition.read()
    }

    /// Whether the engine task exists and has not finished.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Spawns the engine task and waits for the worker to leave
    /// `Starting`.
    ///
    /// Resolves `Ok` once the worker is `Running`, or `Stopped` when a
    /// stop requested before startup completed was honored.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` on a second call, `StartTimeout` if the bound
    /// elapses, or the engine's init failure.
    pub async fn start(&self, start_timeout: Duration) -> Result<(), MaestroError> {
        let boot = self
            .boot
            .lock()
            .take()
            .ok_or_else(|| OrchestratorError::AlreadyStarted {
                key: self.shared.key.clone(),
            })?;
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(run_engine(boot.engine, boot.ctx, shared, boot.stop_rx));
        *self.task.lock() = Some(task);

        let mut rx = self.shared.state_tx.subscribe();
        let confirmed = async {
            loop {
                match *rx.borrow_and_update() {
                    WorkerState::Running | WorkerState::Stopped => return Ok(()),
                    WorkerState::Errored => {
                        let reason = self
                            .last_error()
                            .unwrap_or_else(|| "init failed".to_string());
                        return Err(MaestroError::from(EngineError::InitFailed { reason }));
                    }
                    _ => {}
                }
                if rx.changed().await.is_err() {
                    return Ok(());
                }
            }
        };
        match tokio::time::timeout(start_timeout, confirmed).await {
            Ok(result) => result,
            Err(_) => {
                self.force_errored("start not confirmed in time");
                Err(OrchestratorError::StartTimeout {
                    key: self.shared.key.clone(),
                    timeout_ms: start_timeout.as_millis() as u64,
                }
                .into())
            }
        }
    }

    /// Requests a graceful stop. Idempotent: calls on a worker already
    /// stopping or terminal are no-ops.
    ///
    /// A stop issued while the worker is still `Starting` is deferred
    /// and honored as soon as initialization completes.
    pub fn stop(&self, persist_state: bool) {
        let state = self.state();
        if state.is_terminal() || state == WorkerState::Stopping {
            return;
        }
        self.shared
            .persist_on_stop
            .store(persist_state, Ordering::SeqCst);
        self.stop_tx.send_replace(true);
    }

    /// Resolves once the worker reaches a terminal state, however it
    /// got there.
    pub async fn terminal(&self) -> WorkerState {
        let mut rx = self.shared.state_tx.subscribe();
        loop {
            let state = *rx.borrow_and_update();
            if state.is_terminal() {
                return state;
            }
            if rx.changed().await.is_err() {
                return *rx.borrow();
            }
        }
    }

    /// Waits until the worker reaches a terminal state.
    ///
    /// # Errors
    ///
    /// `StopTimeout` if the bound elapses first.
    pub async fn wait_terminal(&self, timeout: Duration) -> Result<WorkerState, OrchestratorError> {
        tokio::time::timeout(timeout, self.terminal())
            .await
            .map_err(|_| OrchestratorError::StopTimeout {
                key: self.shared.key.clone(),
                timeout_ms: timeout.as_millis() as u64,
            })
    }

    /// Aborts the engine task and forces the worker to `Errored`.
    ///
    /// Used after a stop that never confirmed; no further engine code
    /// runs.
    pub fn force_errored(&self, reason: impl Into<String>) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.shared.record_error(reason);
        self.shared.set_state(WorkerState::Errored);
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("key", &self.shared.key)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

async fn run_engine(
    mut engine: Box<dyn StrategyEngine>,
    ctx: EngineContext,
    shared: Arc<WorkerShared>,
    mut stop_rx: watch::Receiver<bool>,
) {
    shared.set_state(WorkerState::Starting);
    ctx.log().info("run_engine", "worker starting");

    match AssertUnwindSafe(engine.init(&ctx)).catch_unwind().await {
        Err(payload) => {
            let reason = format!("panic in init: {}", panic_reason(payload));
            shared.record_error(reason.as_str());
            ctx.log().critical("run_engine", reason);
            shared.set_state(WorkerState::Errored);
            return;
        }
        Ok(Err(e)) => {
            shared.record_error(e.to_string());
            ctx.log().error("run_engine", e.to_string());
            shared.set_state(WorkerState::Errored);
            return;
        }
        Ok(Ok(())) => {}
    }
    shared.put_stats(engine.stats());

    // A stop requested during init is honored before entering Running.
    if *stop_rx.borrow_and_update() {
        ctx.log().info("run_engine", "deferred stop honored after init");
        shared.set_state(WorkerState::Stopping);
        finish(engine, &ctx, &shared).await;
        return;
    }

    shared.set_state(WorkerState::Running);
    ctx.log().info("run_engine", "worker running");

    let mut ticker = tokio::time::interval(engine.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                match AssertUnwindSafe(engine.poll(&ctx)).catch_unwind().await {
                    Err(payload) => {
                        let reason = format!("panic in poll: {}", panic_reason(payload));
                        shared.record_error(reason.as_str());
                        ctx.log().critical("run_engine", reason);
                        shared.set_state(WorkerState::Errored);
                        return;
                    }
                    Ok(Err(e)) => {
                        shared.record_error(e.to_string());
                        ctx.log().error("run_engine", e.to_string());
                        shared.set_state(WorkerState::Errored);
                        // Best-effort resource release; the error above wins.
                        let _ = AssertUnwindSafe(engine.shutdown(&ctx, false))
                            .catch_unwind()
                            .await;
                        return;
                    }
                    Ok(Ok(())) => shared.put_stats(engine.stats()),
                }
            }
        }
    }

    shared.set_state(WorkerState::Stopping);
    finish(engine, &ctx, &shared).await;
}

async fn finish(mut engine: Box<dyn StrategyEngine>, ctx: &EngineContext, shared: &WorkerShared) {
    let persist = shared.persist_on_stop.load(Ordering::SeqCst);
    match AssertUnwindSafe(engine.shutdown(ctx, persist)).catch_unwind().await {
        Err(payload) => {
            let reason = format!("panic in shutdown: {}", panic_reason(payload));
            shared.record_error(reason.as_str());
            ctx.log().critical("finish", reason);
            shared.set_state(WorkerState::Errored);
            return;
        }
        Ok(Err(e)) => {
            // The stop itself succeeded; keep Stopped but record the
            // shutdown failure for the status surface.
            shared.record_error(e.to_string());
            ctx.log().warning("finish", format!("shutdown: {e}"));
        }
        Ok(Ok(())) => {}
    }
    shared.put_stats(engine.stats());
    ctx.log().info("finish", "worker stopped");
    shared.set_state(WorkerState::Stopped);
}

fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "opaque panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use maestro_core::types::Symbol;
    use std::sync::atomic::AtomicU32;

    use crate::logger::WorkerLogger;
    use crate::persist::NullPersister;

    /// Scriptable engine for lifecycle tests.
    struct ScriptedEngine {
        init_delay: Duration,
        fail_init: bool,
        panic_in_poll: bool,
        poll_delay: Duration,
        shutdowns: Arc<AtomicU32>,
        persisted: Arc<AtomicBool>,
        polls: Arc<AtomicU32>,
    }

    impl Default for ScriptedEngine {
        fn default() -> Self {
            Self {
                init_delay: Duration::ZERO,
                fail_init: false,
                panic_in_poll: false,
                poll_delay: Duration::ZERO,
                shutdowns: Arc::new(AtomicU32::new(0)),
                persisted: Arc::new(AtomicBool::new(false)),
                polls: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    #[async_trait]
    impl StrategyEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn init(&mut self, _ctx: &EngineContext) -> Result<(), EngineError> {
            tokio::time::sleep(self.init_delay).await;
            if self.fail_init {
                return Err(EngineError::InitFailed {
                    reason: "scripted init failure".to_string(),
                });
            }
            Ok(())
        }

        async fn poll(&mut self, _ctx: &EngineContext) -> Result<(), EngineError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if self.panic_in_poll {
                panic!("scripted poll panic");
            }
            tokio::time::sleep(self.poll_delay).await;
            Ok(())
        }

        async fn shutdown(
            &mut self,
            _ctx: &EngineContext,
            persist_state: bool,
        ) -> Result<(), EngineError> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            self.persisted.store(persist_state, Ordering::SeqCst);
            Ok(())
        }

        fn stats(&self) -> Stats {
            let mut stats = Stats::new();
            stats.insert(
                "polls".to_string(),
                serde_json::Value::from(self.polls.load(Ordering::SeqCst)),
            );
            stats
        }

        fn poll_interval(&self) -> Duration {
            Duration::from_millis(10)
        }
    }

    fn handle_for(engine: ScriptedEngine) -> WorkerHandle {
        let key = WorkerKey::new(Some("u1"), &Symbol::new_unchecked("ABC"), "s1");
        let (logger, _feed) = WorkerLogger::new(key.clone());
        let ctx = EngineContext::new(key, Stats::new(), logger, Arc::new(NullPersister));
        WorkerHandle::new(Box::new(engine), ctx)
    }

    #[tokio::test]
    async fn test_start_runs_then_stop_confirms() {
        let engine = ScriptedEngine::default();
        let shutdowns = Arc::clone(&engine.shutdowns);
        let persisted = Arc::clone(&engine.persisted);
        let handle = handle_for(engine);

        handle.start(Duration::from_secs(1)).await.unwrap();
        assert_eq!(handle.state(), WorkerState::Running);

        handle.stop(true);
        let state = handle.wait_terminal(Duration::from_secs(1)).await.unwrap();
        assert_eq!(state, WorkerState::Stopped);
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
        assert!(persisted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_init_failure_goes_errored() {
        let handle = handle_for(ScriptedEngine {
            fail_init: true,
            ..Default::default()
        });
        let err = handle.start(Duration::from_secs(1)).await.unwrap_err();
        assert!(err.to_string().contains("scripted init failure"));
        assert_eq!(handle.state(), WorkerState::Errored);
        assert!(handle.last_error().unwrap().contains("init failure"));
    }

    #[tokio::test]
    async fn test_stop_during_starting_is_deferred() {
        let engine = ScriptedEngine {
            init_delay: Duration::from_millis(100),
            ..Default::default()
        };
        let shutdowns = Arc::clone(&engine.shutdowns);
        let polls = Arc::clone(&engine.polls);
        let handle = Arc::new(handle_for(engine));

        let starter = {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move { handle.start(Duration::from_secs(2)).await })
        };
        // Let the task enter init, then request the stop mid-startup.
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.stop(false);

        starter.await.unwrap().unwrap();
        let state = handle.wait_terminal(Duration::from_secs(1)).await.unwrap();
        assert_eq!(state, WorkerState::Stopped);
        // Init completed, shutdown ran once, the loop never spun.
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let engine = ScriptedEngine::default();
        let shutdowns = Arc::clone(&engine.shutdowns);
        let handle = handle_for(engine);

        handle.start(Duration::from_secs(1)).await.unwrap();
        handle.stop(true);
        handle.stop(true);
        handle.wait_terminal(Duration::from_secs(1)).await.unwrap();
        handle.stop(true);
        assert_eq!(handle.state(), WorkerState::Stopped);
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_poll_panic_goes_errored() {
        let handle = handle_for(ScriptedEngine {
            panic_in_poll: true,
            ..Default::default()
        });
        handle.start(Duration::from_secs(1)).await.unwrap();
        let state = handle.wait_terminal(Duration::from_secs(1)).await.unwrap();
        assert_eq!(state, WorkerState::Errored);
        assert!(handle.last_error().unwrap().contains("scripted poll panic"));
    }

    #[tokio::test]
    async fn test_stop_timeout_then_force_errored() {
        let handle = handle_for(ScriptedEngine {
            poll_delay: Duration::from_secs(30),
            ..Default::default()
        });
        handle.start(Duration::from_secs(1)).await.unwrap();
        // Give the loop time to enter the long poll, which blocks the
        // stop signal from being observed.
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop(false);
        let err = handle
            .wait_terminal(Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::StopTimeout { .. }));

        handle.force_errored("stop not confirmed in time");
        assert_eq!(handle.state(), WorkerState::Errored);
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_second_start_rejected() {
        let handle = handle_for(ScriptedEngine::default());
        handle.start(Duration::from_secs(1)).await.unwrap();
        let err = handle.start(Duration::from_secs(1)).await.unwrap_err();
        assert!(err.to_string().contains("already started"));
    }

    #[tokio::test]
    async fn test_stats_flow_through() {
        let handle = handle_for(ScriptedEngine::default());
        handle.start(Duration::from_secs(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop(false);
        handle.wait_terminal(Duration::from_secs(1)).await.unwrap();
        let stats = handle.stats();
        assert!(stats.get("polls").and_then(|v| v.as_u64()).unwrap() >= 1);
    }
}
