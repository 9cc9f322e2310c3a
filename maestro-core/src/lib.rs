//! # Maestro Core
//!
//! Shared types, error taxonomy, and configuration for the Maestro
//! strategy-worker orchestrator.
//!
//! This crate provides:
//! - Identity and lifecycle types (`WorkerKey`, `WorkerSpec`, `WorkerState`)
//! - Log event types shared between workers and the streaming layer
//! - Hierarchical error types (`MaestroError` and its domain categories)
//! - Configuration with JSON file loading and environment overrides

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Core type definitions
pub mod types;

/// Error types and handling
pub mod error;

/// Configuration management
pub mod config;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::types::*;
}
