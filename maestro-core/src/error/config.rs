//! Configuration error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error type.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("[Config] Failed to read '{path}': {reason}")]
    Io {
        /// Path that failed to load.
        path: String,
        /// Underlying I/O failure.
        reason: String,
    },

    /// Configuration content could not be parsed.
    #[error("[Config] Failed to parse '{path}': {reason}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Underlying parse failure.
        reason: String,
    },

    /// Configuration value failed validation.
    #[error("[Config] Invalid configuration: {reason}")]
    Invalid {
        /// What is invalid and why.
        reason: String,
    },
}
