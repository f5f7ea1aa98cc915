//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::codec::CodecError;
use quiz_core::model::{QuestionId, SessionStateError};
use storage::repository::StorageError;

/// Errors emitted by the test backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("backend request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the session engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session already completed")]
    Completed,
    #[error("final submission already performed")]
    AlreadySubmitted,
    #[error("open-ended tests are finished locally, not submitted")]
    OpenTest,
    #[error("timed tests must be submitted to the server")]
    TimedTest,
    #[error("unknown question id {0}")]
    UnknownQuestion(QuestionId),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    State(#[from] SessionStateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
