//! Per-worker log broadcast.
//!
//! Each worker owns one [`LogBroadcastChannel`]: an ephemeral WebSocket
//! listener that fans the worker's log feed out to any number of
//! observers, replaying the most recent buffered events to each new
//! connection. Observer churn never touches the worker.

#![warn(missing_docs)]

pub mod channel;
mod observer;

pub use channel::LogBroadcastChannel;
