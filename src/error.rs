//! Error types for the chat core

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by chat session operations.
///
/// Truncation is deliberately absent: a `length` finish reason is
/// recoverable and is reported through [`crate::controller::TurnOutcome`].
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("No tokenizer available for {0}")]
    UnsupportedFamily(String),

    #[error("Malformed session: {0}")]
    MalformedSession(String),

    #[error("A completion is already in flight, cannot accept another submission")]
    Busy,

    #[error("Submission disabled until the session is reset")]
    SubmissionLocked,

    #[error("Completion failed: {0}")]
    Completion(String),

    #[error("A system message may only be placed at index 0")]
    MisplacedSystemMessage,

    #[error("Unknown system prompt: {0}")]
    UnknownPrompt(String),

    #[error("Malformed prompt catalog {path}: {reason}")]
    MalformedCatalog { path: PathBuf, reason: String },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ChatError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedSession(reason.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors caused by the caller's sequencing rather than by data.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Busy | Self::SubmissionLocked | Self::InvalidTransition(_)
        )
    }
}

pub type Result<T, E = ChatError> = std::result::Result<T, E>;
