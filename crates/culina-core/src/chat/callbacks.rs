//! Runtime event adapter and answer-marker filtering.
//!
//! [`CallbackAdapter`] narrows the runtime's event hooks to what the
//! pipeline needs: status strings (logged only) and a filtered token
//! stream. The conversational framing interleaves a scratchpad with the
//! final answer in the raw stream, delimited by the `AI:` marker; the
//! adapter buffers everything until the marker is observed, discards the
//! pre-marker buffer, then forwards the rest verbatim.

use std::sync::Mutex;

use tracing::{debug, error};

use culina_types::llm::ANSWER_MARKER;

use crate::chat::relay::RelaySender;
use crate::runtime::RuntimeHandler;

/// Buffers raw streamed tokens until the answer marker appears.
#[derive(Debug, Default)]
struct AnswerFilter {
    buffer: String,
    streaming_answer: bool,
}

impl AnswerFilter {
    /// Feed one raw chunk; returns the text to forward downstream, if any.
    fn push(&mut self, chunk: &str) -> Option<String> {
        if chunk.is_empty() {
            return None;
        }

        if self.streaming_answer {
            // Already past the marker -- forward everything directly.
            return Some(chunk.to_string());
        }

        // Still buffering the scratchpad; accumulate and check for marker.
        self.buffer.push_str(chunk);

        let idx = self.buffer.find(ANSWER_MARKER)?;
        self.streaming_answer = true;

        // Everything after the marker is the beginning of the real answer,
        // minus a single leading space.
        let answer = self.buffer[idx + ANSWER_MARKER.len()..].to_string();
        self.buffer.clear();
        let answer = answer.strip_prefix(' ').unwrap_or(&answer).to_string();

        if answer.trim().is_empty() {
            None
        } else {
            Some(answer)
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.streaming_answer = false;
    }
}

/// Adapts raw runtime events into the pipeline's filtered token stream.
///
/// One adapter belongs to exactly one generation (it holds that
/// generation's [`RelaySender`]) and is constructed in pristine filter
/// state. [`CallbackAdapter::reset`] exists for callers that reuse an
/// adapter across runs: without a reset, a marker observed in a previous
/// stream would leave pass-through mode enabled and leak scratchpad
/// content into the next one.
pub struct CallbackAdapter {
    sink: RelaySender,
    filter: Mutex<AnswerFilter>,
}

impl CallbackAdapter {
    pub fn new(sink: RelaySender) -> Self {
        Self {
            sink,
            filter: Mutex::new(AnswerFilter::default()),
        }
    }

    /// Clear the marker filter so the next stream starts fresh. Must be
    /// called before reusing this adapter for another run.
    pub fn reset(&self) {
        self.filter.lock().expect("filter lock poisoned").reset();
    }
}

impl RuntimeHandler for CallbackAdapter {
    fn on_run_start(&self) {
        debug!(generation = self.sink.generation_id(), "runtime run started");
    }

    fn on_run_end(&self) {
        debug!(generation = self.sink.generation_id(), "runtime run finished");
    }

    fn on_error(&self, message: &str) {
        error!(generation = self.sink.generation_id(), message, "runtime error");
    }

    fn on_tool_start(&self, name: &str) {
        debug!(tool = name, "tool invocation started");
    }

    fn on_tool_end(&self, output_len: usize) {
        debug!(output_len, "tool invocation finished");
    }

    async fn on_token(&self, chunk: &str) {
        let forwarded = {
            let mut filter = self.filter.lock().expect("filter lock poisoned");
            filter.push(chunk)
        };

        if let Some(text) = forwarded {
            // A false return means the generation was retired; stop caring.
            let _ = self.sink.send(text).await;
        }
    }
}

/// Handler that swallows every event. Used for utility generations
/// (summaries) that have no streaming consumer.
pub struct NoopHandler;

impl RuntimeHandler for NoopHandler {
    fn on_run_start(&self) {}
    fn on_run_end(&self) {}
    fn on_error(&self, _message: &str) {}
    fn on_tool_start(&self, _name: &str) {}
    fn on_tool_end(&self, _output_len: usize) {}
    async fn on_token(&self, _chunk: &str) {}
}
