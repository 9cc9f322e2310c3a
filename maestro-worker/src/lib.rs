//! Worker lifecycle harness and engine adapters.
//!
//! A worker is one strategy engine bound to one identity key. The
//! [`WorkerHandle`] drives the engine through the lifecycle state
//! machine on a dedicated task; [`StrategyEngine`] is the seam engine
//! adapters implement.

#![warn(missing_docs)]

pub mod adapters;
pub mod engine;
pub mod handle;
pub mod logger;
pub mod persist;
pub mod registry;

pub use engine::{EngineContext, Stats, StrategyEngine};
pub use handle::WorkerHandle;
pub use logger::WorkerLogger;
pub use persist::{JsonFilePersister, NullPersister, StatePersister};
pub use registry::{EngineRegistry, StrategyRegistry, WorkerFactory};
