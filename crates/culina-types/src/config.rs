//! Chat configuration for Culina.
//!
//! [`ChatConfig`] is constructed once at startup (from `config.toml`, with
//! per-field defaults) and passed by reference into the generation
//! coordinator and its collaborators. There is no process-wide mutable
//! configuration state.

use serde::{Deserialize, Serialize};

/// Configuration for the conversational pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model used for new sessions.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Base URL of the local Ollama service.
    #[serde(default = "default_runtime_url")]
    pub runtime_url: String,

    /// Sampling temperature for generations.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens per generated response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// System prompt appended to every new session.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Prompt template for session keyword summaries. The literal
    /// `{conversation}` placeholder is replaced with the transcript text.
    #[serde(default = "default_summary_prompt")]
    pub summary_prompt: String,

    /// Maximum tokens for a summary generation.
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,

    /// Capacity of the token stream relay between the runtime callback and
    /// the UI. A full buffer exerts backpressure on the producer.
    #[serde(default = "default_relay_capacity")]
    pub relay_capacity: usize,

    /// Maximum number of autocomplete suggestions for `@` mentions.
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            runtime_url: default_runtime_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
            summary_prompt: default_summary_prompt(),
            summary_max_tokens: default_summary_max_tokens(),
            relay_capacity: default_relay_capacity(),
            suggestion_limit: default_suggestion_limit(),
        }
    }
}

fn default_model() -> String {
    "gemma3:4b".to_string()
}

fn default_runtime_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f64 {
    0.9
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_system_prompt() -> String {
    r#"You are a helpful cooking assistant specialized in recipes, ingredients, and culinary knowledge. You have access to a personal cookbook and help the user with cooking-related questions: finding recipes, ingredient substitutions, meal planning, and technique advice.

Guidelines:
- Format your responses using markdown for readability.
- Be helpful and encouraging when giving cooking advice.
- When the user references a recipe with @[Recipe Name], the full recipe data is already provided in the message context; use it directly.

Work through the question in a short scratchpad first, one "Thought:" line per step, then give your final answer on a new line prefixed with "AI:". Only the text after "AI:" is shown to the user."#
        .to_string()
}

fn default_summary_prompt() -> String {
    "Extract 3-5 key words or short phrases (separated by commas) that best \
     describe this cooking conversation. Focus on the main topics, recipes, \
     or ingredients discussed. Do not use full sentences, only keywords. \
     Conversation: {conversation}"
        .to_string()
}

fn default_summary_max_tokens() -> u32 {
    60
}

fn default_relay_capacity() -> usize {
    64
}

fn default_suggestion_limit() -> usize {
    8
}
