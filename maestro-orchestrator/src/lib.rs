//! Orchestration of strategy workers.
//!
//! The [`Orchestrator`] reconciles the set of running workers against a
//! desired-spec snapshot; the [`LifecycleScheduler`] flips workers
//! between running and stopped on a calendar. Status snapshots are the
//! read surface for external tooling.

#![warn(missing_docs)]

pub mod orchestrator;
pub mod scheduler;
pub mod source;
pub mod status;

pub use orchestrator::{Orchestrator, ReconcileSummary, WorkerRecord};
pub use scheduler::{
    AlwaysOpen, LifecycleScheduler, NeverOpen, SchedulePredicate, TickSummary, TradingCalendar,
};
pub use source::{JsonFileSource, SpecSource, StaticSource};
pub use status::{OrchestratorStatus, WorkerStatus};
