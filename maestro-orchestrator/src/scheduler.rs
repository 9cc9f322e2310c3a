//! Calendar-driven lifecycle scheduling.
//!
//! The scheduler owns no worker state. On each tick it evaluates a
//! [`SchedulePredicate`] per retained spec and asks the orchestrator to
//! start or stop the worker; contended keys are skipped until the next
//! tick rather than queued.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use maestro_core::config::SchedulerConfig;
use maestro_core::types::{WorkerSpec, WorkerState};

use crate::orchestrator::Orchestrator;

/// Decides whether a worker should be running at a given instant.
pub trait SchedulePredicate: Send + Sync + 'static {
    /// True when the worker for `spec` should be running at `now`.
    fn should_run(&self, spec: &WorkerSpec, now: DateTime<Utc>) -> bool;
}

/// Weekday trading sessions.
///
/// Default sessions are 09:30-11:30 and 13:00-15:00, matching the
/// A-share cash session; Saturdays and Sundays are always closed.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    sessions: Vec<(NaiveTime, NaiveTime)>,
}

impl Default for TradingCalendar {
    fn default() -> Self {
        let session = |h1, m1, h2, m2| {
            (
                NaiveTime::from_hms_opt(h1, m1, 0).unwrap(),
                NaiveTime::from_hms_opt(h2, m2, 0).unwrap(),
            )
        };
        Self {
            sessions: vec![session(9, 30, 11, 30), session(13, 0, 15, 0)],
        }
    }
}

impl TradingCalendar {
    /// Creates a calendar with explicit sessions.
    #[must_use]
    pub fn new(sessions: Vec<(NaiveTime, NaiveTime)>) -> Self {
        Self { sessions }
    }
}

impl SchedulePredicate for TradingCalendar {
    fn should_run(&self, _spec: &WorkerSpec, now: DateTime<Utc>) -> bool {
        if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let time = now.time();
        self.sessions
            .iter()
            .any(|(open, close)| time >= *open && time < *close)
    }
}

/// Predicate that always holds. Used in tests and always-on setups.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOpen;

impl SchedulePredicate for AlwaysOpen {
    fn should_run(&self, _spec: &WorkerSpec, _now: DateTime<Utc>) -> bool {
        true
    }
}

/// Predicate that never holds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverOpen;

impl SchedulePredicate for NeverOpen {
    fn should_run(&self, _spec: &WorkerSpec, _now: DateTime<Utc>) -> bool {
        false
    }
}

/// Outcome counts of one scheduler tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// Workers started because their window opened.
    pub started: usize,
    /// Workers stopped because their window closed.
    pub stopped: usize,
    /// Workers skipped because their key lock was contended.
    pub skipped: usize,
    /// Start or stop commands that failed.
    pub failed: usize,
}

/// Drives workers in and out of their trading windows.
pub struct LifecycleScheduler {
    orchestrator: Arc<Orchestrator>,
    predicate: Arc<dyn SchedulePredicate>,
    config: SchedulerConfig,
}

impl LifecycleScheduler {
    /// Creates a scheduler over `orchestrator`.
    #[must_use]
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        predicate: Arc<dyn SchedulePredicate>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            orchestrator,
            predicate,
            config,
        }
    }

    /// Tick loop on the configured cadence until `shutdown_rx` flips.
    /// Returns immediately when the scheduler is disabled.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        if !self.config.enabled {
            info!(target: "maestro::scheduler", "scheduler disabled");
            return;
        }
        let mut ticker = tokio::time::interval(self.config.check_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {
                    let summary = self.tick_at(Utc::now()).await;
                    if summary != TickSummary::default() {
                        info!(target: "maestro::scheduler", ?summary, "tick");
                    }
                }
            }
        }
    }

    /// One evaluation pass at an explicit instant.
    ///
    /// Opens workers that are `Stopped` inside their window, closes
    /// active workers outside it. `Errored` workers are left alone;
    /// recovery goes through reconciliation.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickSummary {
        let mut summary = TickSummary::default();
        for key in self.orchestrator.worker_keys() {
            let Some(spec) = self.orchestrator.spec_for(&key) else {
                continue;
            };
            let should_run = self.predicate.should_run(&spec, now);
            let Some(state) = self.orchestrator.worker_state(&key) else {
                continue;
            };

            if should_run && self.config.auto_start && state == WorkerState::Stopped {
                match self.orchestrator.try_start_worker(&key).await {
                    Ok(true) => {
                        debug!(target: "maestro::scheduler", worker = %key, "window open, started");
                        summary.started += 1;
                    }
                    Ok(false) => summary.skipped += 1,
                    Err(e) => {
                        warn!(target: "maestro::scheduler", worker = %key, error = %e, "start failed");
                        summary.failed += 1;
                    }
                }
            } else if !should_run && self.config.auto_stop && state.is_active() {
                match self.orchestrator.try_stop_worker(&key, true).await {
                    Ok(Some(_)) => {
                        debug!(target: "maestro::scheduler", worker = %key, "window closed, stopped");
                        summary.stopped += 1;
                    }
                    Ok(None) => summary.skipped += 1,
                    Err(e) => {
                        warn!(target: "maestro::scheduler", worker = %key, error = %e, "stop failed");
                        summary.failed += 1;
                    }
                }
            }
        }
        summary
    }
}
