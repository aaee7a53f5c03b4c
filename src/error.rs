//! Error types for the focus session engine
//!
//! Every failure in this crate is recoverable from the countdown's point of
//! view. Callers log these and carry on; only the HTTP layer turns some of
//! them into client-visible responses.

use thiserror::Error;

/// Main error type for the focus session engine
#[derive(Error, Debug)]
pub enum FocusError {
    /// Persisted value exists but could not be parsed
    #[error("Persisted value for '{key}' is corrupt: {reason}")]
    PersistenceCorrupt { key: String, reason: String },

    /// Ambient or chime audio could not start
    #[error("Playback unavailable: {0}")]
    PlaybackUnavailable(String),

    /// A call to the remote session or time-block service failed
    #[error("Remote sync failed: {0}")]
    RemoteSync(String),

    /// A configured duration is not a positive number of minutes
    #[error("Invalid duration for {field}: {minutes} (must be > 0)")]
    InvalidDuration { field: &'static str, minutes: u32 },

    /// Operation does not apply to the current timer state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Storage backend I/O errors
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid runtime configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for FocusError {
    fn from(error: reqwest::Error) -> Self {
        FocusError::RemoteSync(error.to_string())
    }
}

impl FocusError {
    /// True for errors caused by the caller's input rather than the environment
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FocusError::InvalidDuration { .. } | FocusError::InvalidState(_)
        )
    }
}

/// Convenience Result type using FocusError
pub type Result<T> = std::result::Result<T, FocusError>;
