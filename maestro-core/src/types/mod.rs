//! Core type definitions for the orchestrator.

use thiserror::Error;

mod key;
mod log;
mod spec;
mod state;
mod symbol;

pub use key::WorkerKey;
pub use log::{LogEvent, LogLevel};
pub use spec::{EngineKind, WorkerSpec};
pub use state::WorkerState;
pub use symbol::Symbol;

/// Validation error for core value types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Symbol string is empty.
    #[error("Symbol cannot be empty")]
    EmptySymbol,

    /// Symbol contains invalid characters.
    #[error("Invalid symbol format: {0}")]
    InvalidSymbol(String),

    /// Engine kind string is not recognized.
    #[error("Unknown engine kind: {0}")]
    UnknownEngineKind(String),
}
