//! Error type shared by every client operation.

use thiserror::Error;

/// Why an operation stopped before producing its result.
///
/// None of these are retried. An operation that fails is abandoned and leaves
/// the session exactly as it found it.
#[derive(Error, Debug)]
pub enum PushError {
    /// The operation could not start: no token could be acquired, a local file
    /// is missing, or similar. No network call was made.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// The request could not be delivered or its response could not be read.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response body was not the JSON shape a later step needs.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl PushError {
    /// Returns true if the operation was abandoned before touching the network.
    pub fn is_precondition(&self) -> bool {
        matches!(self, PushError::PreconditionFailed(_))
    }
}

impl From<reqwest::Error> for PushError {
    fn from(e: reqwest::Error) -> Self {
        PushError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for PushError {
    fn from(e: serde_json::Error) -> Self {
        PushError::Decode(e.to_string())
    }
}
