//! Session keyword-summary generation.
//!
//! After each completed exchange the coordinator fires a best-effort
//! summary refresh: a low-temperature utility generation that extracts a
//! few keywords from the conversation and stores them on the session row.
//! Every failure path is logged and dropped; a summary must never surface
//! as a user-facing error.

use uuid::Uuid;

use tracing::{debug, warn};

use culina_types::chat::{MessageRole, TranscriptEntry};
use culina_types::config::ChatConfig;
use culina_types::llm::GenerationRequest;

use tokio_util::sync::CancellationToken;

use crate::chat::callbacks::NoopHandler;
use crate::runtime::LlmRuntime;
use crate::transcript::TranscriptRepository;

/// Sampling temperature for summary generations; low, for stable keywords.
const SUMMARY_TEMPERATURE: f64 = 0.3;

/// Placeholder in the summary prompt template replaced by the transcript.
const CONVERSATION_PLACEHOLDER: &str = "{conversation}";

/// Generate and store a keyword summary for `session_id`.
pub async fn update_session_summary<R, T>(
    runtime: &R,
    transcripts: &T,
    config: &ChatConfig,
    session_id: Uuid,
    transcript: &[TranscriptEntry],
) where
    R: LlmRuntime,
    T: TranscriptRepository,
{
    let conversation = conversation_text(transcript);
    if conversation.is_empty() {
        return;
    }

    let prompt = config
        .summary_prompt
        .replace(CONVERSATION_PLACEHOLDER, &conversation);

    let request = GenerationRequest {
        model: runtime.model().to_string(),
        messages: vec![TranscriptEntry::human(prompt)],
        temperature: SUMMARY_TEMPERATURE,
        max_tokens: config.summary_max_tokens,
    };

    let response = match runtime
        .generate(request, &NoopHandler, CancellationToken::new())
        .await
    {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, session = %session_id, "summary generation failed");
            return;
        }
    };

    let summary = trim_summary(&response);
    if summary.is_empty() {
        warn!(session = %session_id, "empty summary response, keeping previous");
        return;
    }

    if let Err(err) = transcripts.update_summary(&session_id, summary).await {
        warn!(error = %err, session = %session_id, "failed to store session summary");
        return;
    }

    debug!(session = %session_id, summary, "session summary updated");
}

/// Flatten the transcript into `User:`/`Assistant:` lines, skipping system
/// and tool entries.
fn conversation_text(transcript: &[TranscriptEntry]) -> String {
    let mut out = String::new();
    for entry in transcript {
        match entry.role {
            MessageRole::Human => {
                out.push_str("User: ");
                out.push_str(&entry.content);
                out.push('\n');
            }
            MessageRole::Assistant => {
                out.push_str("Assistant: ");
                out.push_str(&entry.content);
                out.push('\n');
            }
            MessageRole::System | MessageRole::Tool => {}
        }
    }
    out
}

/// Strip whitespace and surrounding quotes from a model-produced summary.
fn trim_summary(raw: &str) -> &str {
    raw.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_text_skips_system_entries() {
        let transcript = vec![
            TranscriptEntry::system("be helpful"),
            TranscriptEntry::human("how do I sear a steak?"),
            TranscriptEntry::assistant("Hot pan, dry surface, don't crowd it."),
        ];
        let text = conversation_text(&transcript);
        assert_eq!(
            text,
            "User: how do I sear a steak?\nAssistant: Hot pan, dry surface, don't crowd it.\n"
        );
    }

    #[test]
    fn test_conversation_text_empty_for_system_only() {
        let transcript = vec![TranscriptEntry::system("be helpful")];
        assert!(conversation_text(&transcript).is_empty());
    }

    #[test]
    fn test_trim_summary_strips_quotes_and_whitespace() {
        assert_eq!(trim_summary("  \"steak, searing, pans\"  "), "steak, searing, pans");
        assert_eq!(trim_summary("'pasta, carbonara'"), "pasta, carbonara");
        assert_eq!(trim_summary("  plain keywords  "), "plain keywords");
        assert_eq!(trim_summary("  \" \" "), "");
    }

    #[test]
    fn test_default_prompt_has_placeholder() {
        let config = ChatConfig::default();
        assert!(config.summary_prompt.contains(CONVERSATION_PLACEHOLDER));
    }
}
