//! Built-in engine adapters.

pub mod replay;
pub mod sim;

pub use replay::ReplayEngine;
pub use sim::SimEngine;
