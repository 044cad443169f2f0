use thiserror::Error;

use crate::llm::RuntimeError;

/// Errors from the conversational pipeline.
///
/// Anything that prevents a generation from starting is returned
/// synchronously to the caller. Persistence and summary failures never
/// appear here; they are logged inside background tasks.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("no input provided")]
    EmptyInput,

    #[error("failed to create session: {0}")]
    SessionCreationFailed(String),

    #[error("failed to load session: {0}")]
    SessionLoadFailed(String),

    #[error("model '{0}' is not installed")]
    ModelNotInstalled(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Errors from repository operations (used by trait definitions in
/// culina-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}
