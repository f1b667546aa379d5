//! Error types for asyncval.
//!
//! Engine-level failures only. Producer failures are never wrapped: the cache hands
//! back the producer's own error value so every caller sharing a computation sees
//! the identical failure.

use thiserror::Error;

/// Result type alias using `CacheError`.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Main error type for asyncval operations.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Configuration could not be parsed from JSON.
    #[error("JSON error: {0}")]
    JsonError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // MAINTENANCE TIMER ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A periodic expiration timer needs a Tokio runtime to run on.
    #[error("No Tokio runtime available to drive the expiration timer")]
    NoRuntime,

    /// The engine already owns a running expiration timer.
    #[error("Expiration timer is already running")]
    TimerAlreadyRunning,

    // ═══════════════════════════════════════════════════════════════════════════
    // PRODUCER ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A cloneable, string-backed producer failure.
    ///
    /// Producers are free to use their own error type; this variant exists for
    /// callers that just want something `Clone` to return.
    #[error("Producer failed: {0}")]
    Producer(String),
}

impl CacheError {
    /// Returns true if this is a configuration error.
    pub fn is_config_error(&self) -> bool {
        matches!(self, CacheError::ConfigError(_) | CacheError::JsonError(_))
    }

    /// Returns true if this error came from a value producer.
    pub fn is_producer_error(&self) -> bool {
        matches!(self, CacheError::Producer(_))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::JsonError(err.to_string())
    }
}
