//! LLM runtime request and error types for Culina.
//!
//! These types model the boundary between the generation pipeline and the
//! model runtime: the request shape sent to the runtime, the generation
//! identifier used to fence async events, and runtime errors.

use serde::{Deserialize, Serialize};

use crate::chat::TranscriptEntry;

/// Monotonic identifier for one user-turn -> assistant-response cycle.
///
/// Assigned when a generation is dispatched and never reused. Any async
/// event (token fragment, completion) carrying a stale id must be discarded
/// by the consumer.
pub type GenerationId = u64;

/// Marker token the conversational agent framing uses to prefix its final
/// answer. Everything streamed before the marker is scratchpad content and
/// is never shown to the user.
pub const ANSWER_MARKER: &str = "AI:";

/// Request to the LLM runtime for one generation.
///
/// `messages` carries the full conversation (system prompt included); the
/// last entry is the current, possibly mention-expanded, human turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<TranscriptEntry>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Errors from LLM runtime operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("model '{0}' is not installed")]
    ModelNotFound(String),

    #[error("generation cancelled")]
    Cancelled,
}
