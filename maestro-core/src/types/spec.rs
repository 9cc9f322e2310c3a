//! Desired worker specification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Symbol, ValidationError, WorkerKey};

/// Execution engine selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// In-process simulated engine.
    #[default]
    Sim,
    /// Tick-replay engine.
    Replay,
}

impl EngineKind {
    /// Returns the engine kind as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sim => "sim",
            Self::Replay => "replay",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sim" => Ok(Self::Sim),
            "replay" => Ok(Self::Replay),
            other => Err(ValidationError::UnknownEngineKind(other.to_string())),
        }
    }
}

/// Immutable desired configuration for one worker.
///
/// The identity key is derived from `owner_id`, `symbol`, and
/// `strategy_key`; everything else is payload. The optional legacy
/// `engine_class` field overrides strategy-registry resolution when
/// present, for backward compatibility with older configuration entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Owning user, if any.
    #[serde(default)]
    pub owner_id: Option<String>,

    /// Instrument the worker trades.
    pub symbol: Symbol,

    /// User-facing strategy identifier (e.g. "hidden_dragon").
    pub strategy_key: String,

    /// Whether this worker should exist at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Which execution engine adapter runs the strategy.
    #[serde(default)]
    pub engine: EngineKind,

    /// Legacy engine class override; preferred over registry resolution.
    #[serde(default)]
    pub engine_class: Option<String>,

    /// Engine-specific parameters.
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

impl WorkerSpec {
    /// Derives the identity key for this spec.
    #[must_use]
    pub fn key(&self) -> WorkerKey {
        WorkerKey::new(self.owner_id.as_deref(), &self.symbol, &self.strategy_key)
    }

    /// Returns true if replacing `current` with `self` requires a
    /// destroy-then-create of the running worker.
    ///
    /// The enabled flag is handled separately by reconciliation; identity
    /// fields cannot differ for the same key.
    #[must_use]
    pub fn requires_restart(&self, current: &WorkerSpec) -> bool {
        self.engine != current.engine
            || self.engine_class != current.engine_class
            || self.params != current.params
    }

    /// Returns true if the spec is well-formed enough to create a worker.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.symbol.is_valid() && !self.strategy_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(params: serde_json::Value) -> WorkerSpec {
        WorkerSpec {
            owner_id: Some("u1".to_string()),
            symbol: Symbol::new_unchecked("002050.SZ"),
            strategy_key: "hidden_dragon".to_string(),
            enabled: true,
            engine: EngineKind::Sim,
            engine_class: None,
            params: params.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_key_derivation() {
        let s = spec(json!({}));
        assert_eq!(s.key().as_str(), "u1:002050.SZ:hidden_dragon");
    }

    #[test]
    fn test_requires_restart_on_param_change() {
        let a = spec(json!({"window": 20}));
        let b = spec(json!({"window": 30}));
        assert!(b.requires_restart(&a));
        assert!(!a.requires_restart(&a.clone()));
    }

    #[test]
    fn test_requires_restart_on_engine_class_change() {
        let a = spec(json!({}));
        let mut b = a.clone();
        b.engine_class = Some("scripts.single_stream.Engine".to_string());
        assert!(b.requires_restart(&a));
    }

    #[test]
    fn test_deserialize_defaults() {
        let s: WorkerSpec = serde_json::from_value(json!({
            "symbol": "600519.SH",
            "strategy_key": "turtle"
        }))
        .unwrap();
        assert!(s.enabled);
        assert_eq!(s.engine, EngineKind::Sim);
        assert!(s.owner_id.is_none());
        assert!(s.params.is_empty());
    }

    #[test]
    fn test_deserialize_legacy_engine_class() {
        let s: WorkerSpec = serde_json::from_value(json!({
            "symbol": "600519.SH",
            "strategy_key": "turtle",
            "engine": "replay",
            "engine_class": "legacy.path.Engine"
        }))
        .unwrap();
        assert_eq!(s.engine, EngineKind::Replay);
        assert_eq!(s.engine_class.as_deref(), Some("legacy.path.Engine"));
    }

    #[test]
    fn test_is_valid() {
        let mut s = spec(json!({}));
        assert!(s.is_valid());
        s.strategy_key.clear();
        assert!(!s.is_valid());
    }

    #[test]
    fn test_engine_kind_from_str() {
        assert_eq!("sim".parse::<EngineKind>().unwrap(), EngineKind::Sim);
        assert!("vnpy".parse::<EngineKind>().is_err());
    }
}
