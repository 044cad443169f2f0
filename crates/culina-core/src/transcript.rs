//! TranscriptRepository trait definition.
//!
//! Persistence port for chat sessions and their messages. All pipeline
//! writes through this trait are best-effort: the coordinator logs
//! failures instead of surfacing them, except for session creation.
//! Implementations live in culina-infra (e.g., `SqliteTranscriptRepository`).

use uuid::Uuid;

use culina_types::chat::{ChatSession, SessionMessage};
use culina_types::error::RepositoryError;

/// Repository trait for chat session and message persistence.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait TranscriptRepository: Send + Sync {
    /// Create a new chat session.
    fn create_session(
        &self,
        session: &ChatSession,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a chat session by its unique ID.
    fn get_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatSession>, RepositoryError>> + Send;

    /// List sessions, most recent first.
    fn list_sessions(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ChatSession>, RepositoryError>> + Send;

    /// Save a new message within a session.
    fn save_message(
        &self,
        message: &SessionMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get messages for a session, ordered by creation time.
    fn get_messages(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<SessionMessage>, RepositoryError>> + Send;

    /// Update the keyword summary on a session.
    fn update_summary(
        &self,
        session_id: &Uuid,
        summary: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
