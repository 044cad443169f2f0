//! Wire types for the Ollama HTTP API.
//!
//! Request/response shapes for `POST /api/chat` (NDJSON streaming) and
//! `GET /api/tags` (installed model listing).

use serde::{Deserialize, Serialize};

use culina_types::chat::MessageRole;

/// A message in the Ollama chat request/response format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: String,
    pub content: String,
}

/// Model options forwarded with a chat request.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaOptions {
    pub temperature: f64,
    /// Ollama's name for the max-output-token limit.
    pub num_predict: i64,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    pub options: OllamaOptions,
}

/// One NDJSON line of a streaming chat response.
///
/// While streaming, each line carries a `message` delta; the final line
/// has `done: true`. Errors arrive as a line with only an `error` field.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaChatChunk {
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `GET /api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaTagsResponse {
    #[serde(default)]
    pub models: Vec<OllamaModelEntry>,
}

/// One installed model in the tags listing.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModelEntry {
    pub name: String,
}

/// Map a transcript role onto Ollama's role strings.
pub fn wire_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::Human => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    }
}
