//! Configuration management.
//!
//! Load order, highest priority first: environment variables, then the
//! JSON configuration file, then hardcoded defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Desired-spec reload interval in seconds; 0 disables auto-reload.
    #[serde(default = "default_reload_interval_secs")]
    pub reload_interval_secs: u64,

    /// Bound on waiting for a worker to leave `Starting`.
    #[serde(default = "default_start_timeout_secs")]
    pub start_timeout_secs: u64,

    /// Bound on waiting for a worker to confirm shutdown.
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,

    /// Lifecycle scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Log broadcast channel settings.
    #[serde(default)]
    pub stream: StreamConfig,
}

fn default_reload_interval_secs() -> u64 {
    60
}

fn default_start_timeout_secs() -> u64 {
    10
}

fn default_stop_timeout_secs() -> u64 {
    5
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            reload_interval_secs: default_reload_interval_secs(),
            start_timeout_secs: default_start_timeout_secs(),
            stop_timeout_secs: default_stop_timeout_secs(),
            scheduler: SchedulerConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

impl ManagerConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` or `ConfigError::Parse` on failure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Applies environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MAESTRO_RELOAD_INTERVAL") {
            if let Ok(secs) = val.parse() {
                self.reload_interval_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("MAESTRO_START_TIMEOUT") {
            if let Ok(secs) = val.parse() {
                self.start_timeout_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("MAESTRO_STOP_TIMEOUT") {
            if let Ok(secs) = val.parse() {
                self.stop_timeout_secs = secs;
            }
        }
        self.scheduler.apply_env_overrides();
        self.stream.apply_env_overrides();
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "start_timeout_secs must be > 0".to_string(),
            });
        }
        if self.stop_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "stop_timeout_secs must be > 0".to_string(),
            });
        }
        self.scheduler.validate()?;
        self.stream.validate()
    }

    /// Returns the reload interval, or `None` when auto-reload is disabled.
    #[must_use]
    pub fn reload_interval(&self) -> Option<Duration> {
        (self.reload_interval_secs > 0).then(|| Duration::from_secs(self.reload_interval_secs))
    }

    /// Returns the start confirmation bound as a Duration.
    #[must_use]
    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    /// Returns the stop confirmation bound as a Duration.
    #[must_use]
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

/// Lifecycle scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the scheduler runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Polling cadence in seconds.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Whether the scheduler may start workers when the predicate holds.
    #[serde(default = "default_true")]
    pub auto_start: bool,

    /// Whether the scheduler may stop workers when the predicate fails.
    #[serde(default = "default_true")]
    pub auto_stop: bool,
}

fn default_true() -> bool {
    true
}

fn default_check_interval_secs() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_secs: default_check_interval_secs(),
            auto_start: true,
            auto_stop: true,
        }
    }
}

impl SchedulerConfig {
    /// Applies environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MAESTRO_SCHEDULER_ENABLED") {
            self.enabled = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
        }
        if let Ok(val) = std::env::var("MAESTRO_SCHEDULER_INTERVAL") {
            if let Ok(secs) = val.parse() {
                self.check_interval_secs = secs;
            }
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the cadence is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "scheduler.check_interval_secs must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the polling cadence as a Duration.
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

/// Log broadcast channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Host the ephemeral listener binds to (port is always OS-chosen).
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Ring buffer capacity: the most recent N events replayed to new
    /// observers.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Maximum concurrent observers per channel.
    #[serde(default = "default_max_observers")]
    pub max_observers: usize,

    /// Per-observer outbound queue capacity; oldest unsent events drop
    /// when a slow observer overflows it.
    #[serde(default = "default_observer_queue_capacity")]
    pub observer_queue_capacity: usize,
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_buffer_capacity() -> usize {
    1000
}

fn default_max_observers() -> usize {
    64
}

fn default_observer_queue_capacity() -> usize {
    256
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            buffer_capacity: default_buffer_capacity(),
            max_observers: default_max_observers(),
            observer_queue_capacity: default_observer_queue_capacity(),
        }
    }
}

impl StreamConfig {
    /// Applies environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MAESTRO_STREAM_HOST") {
            self.bind_host = val;
        }
        if let Ok(val) = std::env::var("MAESTRO_STREAM_BUFFER") {
            if let Ok(n) = val.parse() {
                self.buffer_capacity = n;
            }
        }
        if let Ok(val) = std::env::var("MAESTRO_STREAM_MAX_OBSERVERS") {
            if let Ok(n) = val.parse() {
                self.max_observers = n;
            }
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if any capacity is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Invalid {
                reason: "stream.buffer_capacity must be > 0".to_string(),
            });
        }
        if self.observer_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                reason: "stream.observer_queue_capacity must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
