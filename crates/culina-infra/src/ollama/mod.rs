//! OllamaRuntime -- concrete [`LlmRuntime`] implementation for a local
//! Ollama service.
//!
//! Sends chat requests to `POST /api/chat` with `stream: true` and decodes
//! the NDJSON response line by line, forwarding each content delta to the
//! pipeline's [`RuntimeHandler`]. Cancellation is observed between chunks
//! via `tokio::select!` on the caller's token; the HTTP request is dropped
//! (and the connection torn down) as soon as the token fires.

pub mod types;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use culina_core::runtime::{LlmRuntime, RuntimeHandler};
use culina_types::llm::{ANSWER_MARKER, GenerationRequest, RuntimeError};

use self::types::{
    OllamaChatChunk, OllamaChatRequest, OllamaMessage, OllamaOptions, OllamaTagsResponse,
    wire_role,
};

/// LLM runtime backed by a local Ollama service.
///
/// The HTTP client is built without a total-request timeout: generations
/// are unbounded and a hung runtime call is only broken by user-triggered
/// cancellation.
#[derive(Clone)]
pub struct OllamaRuntime {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaRuntime {
    /// Create a runtime bound to `base_url` (e.g. `http://localhost:11434`)
    /// and `model`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build_chat_request(&self, request: &GenerationRequest) -> OllamaChatRequest {
        OllamaChatRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: wire_role(m.role).to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream: true,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens as i64,
            },
        }
    }
}

/// Decode one NDJSON line of a streaming chat response.
fn decode_chunk(line: &str) -> Result<OllamaChatChunk, RuntimeError> {
    serde_json::from_str(line).map_err(|e| RuntimeError::Decode(format!("bad chunk: {e}")))
}

/// Extract the user-facing answer from the raw accumulated output.
///
/// The conversational framing prefixes the final answer with the `AI:`
/// marker after a scratchpad; output without the marker is returned whole.
fn extract_final_answer(raw: &str) -> &str {
    match raw.find(ANSWER_MARKER) {
        Some(idx) => raw[idx + ANSWER_MARKER.len()..].trim(),
        None => raw.trim(),
    }
}

/// Map an HTTP error body from Ollama to a runtime error.
fn map_http_error(status: reqwest::StatusCode, body: &str, model: &str) -> RuntimeError {
    if status == reqwest::StatusCode::NOT_FOUND && body.contains("not found") {
        return RuntimeError::ModelNotFound(model.to_string());
    }
    RuntimeError::Runtime(format!("ollama returned {status}: {body}"))
}

impl LlmRuntime for OllamaRuntime {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate<H: RuntimeHandler>(
        &self,
        request: GenerationRequest,
        handler: &H,
        cancel: CancellationToken,
    ) -> Result<String, RuntimeError> {
        let body = self.build_chat_request(&request);
        handler.on_run_start();

        let send = self.client.post(self.url("/api/chat")).json(&body).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => {
                handler.on_error("generation cancelled");
                return Err(RuntimeError::Cancelled);
            }
            result = send => result.map_err(|e| RuntimeError::Transport(e.to_string()))?,
        };

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let err = map_http_error(status, &text, &request.model);
            handler.on_error(&err.to_string());
            return Err(err);
        }

        let mut stream = response.bytes_stream();
        let mut line_buf: Vec<u8> = Vec::new();
        let mut full = String::new();

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    handler.on_error("generation cancelled");
                    return Err(RuntimeError::Cancelled);
                }
                next = stream.next() => match next {
                    Some(bytes) => bytes.map_err(|e| RuntimeError::Transport(e.to_string()))?,
                    None => break,
                },
            };

            line_buf.extend_from_slice(&chunk);
            while let Some(pos) = line_buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = line_buf.drain(..=pos).collect();
                let line = std::str::from_utf8(&line[..line.len() - 1])
                    .map_err(|e| RuntimeError::Decode(e.to_string()))?
                    .trim();
                if line.is_empty() {
                    continue;
                }

                let parsed = decode_chunk(line)?;
                if let Some(message) = parsed.error {
                    handler.on_error(&message);
                    return Err(RuntimeError::Runtime(message));
                }
                if let Some(message) = parsed.message {
                    if !message.content.is_empty() {
                        handler.on_token(&message.content).await;
                        full.push_str(&message.content);
                    }
                }
                if parsed.done {
                    handler.on_run_end();
                    return Ok(extract_final_answer(&full).to_string());
                }
            }
        }

        handler.on_run_end();
        Ok(extract_final_answer(&full).to_string())
    }

    async fn installed_models(&self) -> Result<Vec<String>, RuntimeError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| RuntimeError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RuntimeError::Runtime(format!(
                "ollama returned {} for /api/tags",
                response.status()
            )));
        }

        let tags: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| RuntimeError::Decode(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn with_model(&self, model: &str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use culina_types::chat::{MessageRole, TranscriptEntry};

    fn runtime() -> OllamaRuntime {
        OllamaRuntime::new("http://localhost:11434/", "gemma3:4b")
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let rt = runtime();
        assert_eq!(rt.url("/api/chat"), "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_with_model_keeps_endpoint() {
        let rt = runtime().with_model("llama3.2:3b");
        assert_eq!(rt.model(), "llama3.2:3b");
        assert_eq!(rt.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_build_chat_request_maps_roles() {
        let rt = runtime();
        let request = GenerationRequest {
            model: "gemma3:4b".to_string(),
            messages: vec![
                TranscriptEntry::new(MessageRole::System, "be helpful"),
                TranscriptEntry::new(MessageRole::Human, "hi"),
                TranscriptEntry::new(MessageRole::Assistant, "hello"),
            ],
            temperature: 0.7,
            max_tokens: 500,
        };

        let body = rt.build_chat_request(&request);
        assert!(body.stream);
        assert_eq!(body.options.num_predict, 500);
        let roles: Vec<&str> = body.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
    }

    #[test]
    fn test_decode_chunk_rejects_garbage() {
        assert!(decode_chunk("not json").is_err());
        assert!(decode_chunk(r#"{"done":false}"#).is_ok());
    }

    #[test]
    fn test_extract_final_answer_with_marker() {
        let raw = "Thought: the user asked about timing.\nAI: About 15 minutes.";
        assert_eq!(extract_final_answer(raw), "About 15 minutes.");
    }

    #[test]
    fn test_extract_final_answer_without_marker() {
        assert_eq!(extract_final_answer("  plain answer \n"), "plain answer");
    }

    #[test]
    fn test_map_http_error_model_not_found() {
        let err = map_http_error(
            reqwest::StatusCode::NOT_FOUND,
            r#"{"error":"model 'nope' not found, try pulling it first"}"#,
            "nope",
        );
        assert!(matches!(err, RuntimeError::ModelNotFound(_)));
    }

    #[test]
    fn test_map_http_error_other_status() {
        let err = map_http_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom", "m");
        assert!(matches!(err, RuntimeError::Runtime(_)));
    }
}
