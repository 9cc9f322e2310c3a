//! Log event types shared by workers and the streaming layer.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a log event.
///
/// Wire names match the legacy console feed (`DEBUG` .. `CRITICAL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Routine operational message.
    Info,
    /// Something unexpected but survivable.
    Warning,
    /// An operation failed.
    Error,
    /// The worker cannot continue.
    Critical,
}

impl LogLevel {
    /// Returns the level as its wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single log event produced by a worker.
///
/// Immutable once emitted. Serialized as the wire message sent to each
/// observer:
///
/// ```json
/// {
///   "timestamp": "2024-01-01T09:30:00.000Z",
///   "level": "INFO",
///   "message": "engine initialized",
///   "source_identity": "u1:002050.SZ:hidden_dragon",
///   "module": "sim",
///   "func_name": "init",
///   "line_no": 42
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Emission time (serialized ISO-8601).
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Formatted message text.
    pub message: String,
    /// Identity of the emitting worker (its key).
    pub source_identity: String,
    /// Module that produced the event.
    pub module: String,
    /// Function that produced the event.
    pub func_name: String,
    /// Source line.
    pub line_no: u32,
}

impl LogEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(
        level: LogLevel,
        message: impl Into<String>,
        source_identity: impl Into<String>,
        module: impl Into<String>,
        func_name: impl Into<String>,
        line_no: u32,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            source_identity: source_identity.into(),
            module: module.into(),
            func_name: func_name.into(),
            line_no,
        }
    }

    /// Returns the timestamp formatted as an ISO-8601 string.
    #[must_use]
    pub fn timestamp_iso8601(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_wire_names() {
        assert_eq!(serde_json::to_string(&LogLevel::Info).unwrap(), "\"INFO\"");
        assert_eq!(
            serde_json::to_string(&LogLevel::Critical).unwrap(),
            "\"CRITICAL\""
        );
        let parsed: LogLevel = serde_json::from_str("\"WARNING\"").unwrap();
        assert_eq!(parsed, LogLevel::Warning);
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Error < LogLevel::Critical);
    }

    #[test]
    fn test_event_wire_fields() {
        let event = LogEvent::new(LogLevel::Info, "hello", "u1:ABC:s1", "sim", "poll", 7);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["level"], "INFO");
        assert_eq!(json["message"], "hello");
        assert_eq!(json["source_identity"], "u1:ABC:s1");
        assert_eq!(json["module"], "sim");
        assert_eq!(json["func_name"], "poll");
        assert_eq!(json["line_no"], 7);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_serde_roundtrip() {
        let event = LogEvent::new(LogLevel::Error, "boom", "-:ABC:s1", "engine", "run", 1);
        let json = serde_json::to_string(&event).unwrap();
        let parsed: LogEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }
}
