use thiserror::Error;

use crate::models::UserChoice;

/// Errors surfaced to callers of the library.
///
/// Analyzer failures never appear here: they are absorbed by the fail-open
/// degraded-save path inside the engine. Everything else is reported to the
/// immediate caller with the session left untouched (or, for persistence
/// failures, parked for a retry).
#[derive(Debug, Error)]
pub enum CoachError {
    #[error("commitment text is empty")]
    EmptyCommitment,

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session already exists: {0}")]
    DuplicateSession(String),

    #[error("choice '{choice}' is not available while the session is {state}")]
    InvalidTransition { state: String, choice: UserChoice },

    #[error("free-form text arrived while no rewrite was pending")]
    UnexpectedInput,

    #[error("session {0} has no recorded analysis")]
    NoAttemptRecorded(String),

    #[error("failed to persist commitment for session {session_id}: {message}")]
    Persistence { session_id: String, message: String },

    #[error(transparent)]
    Template(#[from] minijinja::Error),
}

pub type Result<T> = std::result::Result<T, CoachError>;
