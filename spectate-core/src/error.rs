//! Session-level errors
//!
//! Cancellation is not an error; see [`crate::session::SessionOutcome`].

use spectate_client::{ChunkKind, SpectatorError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No featured games available")]
    NoGamesAvailable,

    /// Discovery, metadata or poll body did not match the expected schema
    #[error("Incompatible response: {0}")]
    Decode(#[source] SpectatorError),

    /// Retry budget exhausted; carries the last underlying error
    #[error("Session failed: {source}")]
    Failed {
        #[source]
        source: SpectatorError,
    },

    /// Raised only when the missing-chunk policy is `abort`
    #[error("{kind} {id} could not be retrieved")]
    MissingChunk { kind: ChunkKind, id: i64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Session task aborted: {0}")]
    Aborted(String),
}

impl SessionError {
    /// Map a client error that escaped its retry budget
    #[must_use]
    pub fn from_exhausted(err: SpectatorError) -> Self {
        match err {
            SpectatorError::Decode(_) => Self::Decode(err),
            SpectatorError::InvalidConfig(msg) => Self::InvalidConfig(msg),
            other => Self::Failed { source: other },
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
