//! Chat session and transcript types for Culina.
//!
//! These types model the persisted conversation: sessions, stored messages,
//! and the in-memory transcript entries the generation pipeline works with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Role of a message in a conversation.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role IN ('system', 'human', 'assistant', 'tool'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    Human,
    Assistant,
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::Human => write!(f, "human"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "human" => Ok(MessageRole::Human),
            "assistant" => Ok(MessageRole::Assistant),
            "tool" => Ok(MessageRole::Tool),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single entry in the in-memory conversation transcript.
///
/// This is the lightweight shape the generation pipeline shuffles around;
/// the persisted counterpart with identity and timestamps is
/// [`SessionMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: MessageRole,
    pub content: String,
}

impl TranscriptEntry {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Human, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// A chat session between the user and the assistant.
///
/// `summary` holds the keyword summary generated after each exchange;
/// `message_count` is maintained by the repository on every saved message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub model: String,
    pub summary: Option<String>,
    pub message_count: u32,
}

impl ChatSession {
    /// Create a new session record for the given model.
    pub fn new(model: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            started_at: Utc::now(),
            model,
            summary: None,
            message_count: 0,
        }
    }
}

/// A single persisted message within a chat session.
///
/// Messages are ordered by `created_at` within a session. The model that
/// produced (or received) the message is recorded so a reloaded session can
/// restore the model it was started with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl SessionMessage {
    /// Create a new message record for a session.
    pub fn new(
        session_id: Uuid,
        role: MessageRole,
        content: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            session_id,
            role,
            content: content.into(),
            model: model.into(),
            created_at: Utc::now(),
        }
    }

    /// View this persisted message as an in-memory transcript entry.
    pub fn to_entry(&self) -> TranscriptEntry {
        TranscriptEntry::new(self.role, self.content.clone())
    }
}
