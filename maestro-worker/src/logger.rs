//! Per-worker logging.
//!
//! Every event is mirrored to the process-wide `tracing` subscriber and
//! pushed onto the worker's broadcast feed. The feed is bounded: when
//! the drain side stalls, new events are dropped and counted rather
//! than blocking the engine.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use maestro_core::types::{LogEvent, LogLevel, WorkerKey};

/// Default capacity of the engine-to-channel feed queue.
pub const FEED_CAPACITY: usize = 1024;

/// Handle workers use to emit log events.
///
/// Cloneable; all clones share the feed and the drop counter.
#[derive(Debug, Clone)]
pub struct WorkerLogger {
    key: WorkerKey,
    feed_tx: mpsc::Sender<LogEvent>,
    dropped: Arc<AtomicU64>,
}

impl WorkerLogger {
    /// Creates a logger and the receiving end of its feed.
    #[must_use]
    pub fn new(key: WorkerKey) -> (Self, mpsc::Receiver<LogEvent>) {
        Self::with_capacity(key, FEED_CAPACITY)
    }

    /// Creates a logger with an explicit feed capacity.
    #[must_use]
    pub fn with_capacity(key: WorkerKey, capacity: usize) -> (Self, mpsc::Receiver<LogEvent>) {
        let (feed_tx, feed_rx) = mpsc::channel(capacity);
        (
            Self {
                key,
                feed_tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            feed_rx,
        )
    }

    /// Returns the identity of the emitting worker.
    #[must_use]
    pub fn key(&self) -> &WorkerKey {
        &self.key
    }

    /// Number of events dropped because the feed was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Emits a fully-formed event.
    pub fn emit(&self, event: LogEvent) {
        match event.level {
            LogLevel::Debug => {
                tracing::debug!(target: "maestro::worker", worker = %self.key, "{}", event.message);
            }
            LogLevel::Info => {
                tracing::info!(target: "maestro::worker", worker = %self.key, "{}", event.message);
            }
            LogLevel::Warning => {
                tracing::warn!(target: "maestro::worker", worker = %self.key, "{}", event.message);
            }
            LogLevel::Error | LogLevel::Critical => {
                tracing::error!(target: "maestro::worker", worker = %self.key, "{}", event.message);
            }
        }
        if let Err(mpsc::error::TrySendError::Full(_)) = self.feed_tx.try_send(event) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Emits at DEBUG level.
    #[track_caller]
    pub fn debug(&self, func_name: &str, message: impl Into<String>) {
        self.at(LogLevel::Debug, func_name, message);
    }

    /// Emits at INFO level.
    #[track_caller]
    pub fn info(&self, func_name: &str, message: impl Into<String>) {
        self.at(LogLevel::Info, func_name, message);
    }

    /// Emits at WARNING level.
    #[track_caller]
    pub fn warning(&self, func_name: &str, message: impl Into<String>) {
        self.at(LogLevel::Warning, func_name, message);
    }

    /// Emits at ERROR level.
    #[track_caller]
    pub fn error(&self, func_name: &str, message: impl Into<String>) {
        self.at(LogLevel::Error, func_name, message);
    }

    /// Emits at CRITICAL level.
    #[track_caller]
    pub fn critical(&self, func_name: &str, message: impl Into<String>) {
        self.at(LogLevel::Critical, func_name, message);
    }

    #[track_caller]
    fn at(&self, level: LogLevel, func_name: &str, message: impl Into<String>) {
        let loc = std::panic::Location::caller();
        self.emit(LogEvent::new(
            level,
            message,
            self.key.to_string(),
            module_from_file(loc.file()),
            func_name,
            loc.line(),
        ));
    }
}

fn module_from_file(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file)
        .to_string()
}
