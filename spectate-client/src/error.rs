//! Spectator Client Error Types
//!
//! Transport-level errors only. Session semantics (gaps, retry ceilings,
//! cancellation) are layered on top in spectate-core.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SpectatorError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SpectatorError {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures and unexpected statuses are transient; a body that
    /// does not match the schema will not fix itself.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Status { .. })
    }
}

impl From<reqwest::Error> for SpectatorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SpectatorError::Decode(err.to_string())
        } else {
            SpectatorError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SpectatorError {
    fn from(err: serde_json::Error) -> Self {
        SpectatorError::Decode(err.to_string())
    }
}
