//! Worker identity key.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Symbol;

/// Deterministic identity key for a worker.
///
/// Composed from the owning user, the instrument symbol, and the strategy
/// identifier. The same spec always produces the same key, so the key is
/// usable as the map key everywhere a worker is tracked.
///
/// # Examples
///
/// ```
/// use maestro_core::types::{Symbol, WorkerKey};
///
/// let key = WorkerKey::new(Some("u1"), &Symbol::new_unchecked("002050.SZ"), "hidden_dragon");
/// assert_eq!(key.as_str(), "u1:002050.SZ:hidden_dragon");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerKey(String);

impl WorkerKey {
    /// Builds a key from its identity components.
    ///
    /// Workers without an owner use `-` in the owner position so the key
    /// shape stays fixed.
    #[must_use]
    pub fn new(owner_id: Option<&str>, symbol: &Symbol, strategy_key: &str) -> Self {
        Self(format!(
            "{}:{}:{}",
            owner_id.unwrap_or("-"),
            symbol.as_str(),
            strategy_key
        ))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
