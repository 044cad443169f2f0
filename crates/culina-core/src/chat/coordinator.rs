//! Generation lifecycle coordination.
//!
//! [`GenerationCoordinator`] orchestrates prepare -> dispatch -> stream ->
//! finalize/cancel for the conversational pipeline. It owns the
//! conversation memory, the cancellation token, the current stream relay,
//! and the monotonic generation-id counter.
//!
//! Threading model: the coordinator lives on the UI task. Conversation
//! memory and the id counter are only ever touched there; background tasks
//! run the runtime call and report back through a completion channel, and
//! the UI task applies the result via [`GenerationCoordinator::finalize`].
//! The only resource crossing tasks is the per-generation relay, whose
//! ownership is transferred by swap, never shared.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use tracing::{debug, warn};

use culina_types::chat::{ChatSession, MessageRole, SessionMessage, TranscriptEntry};
use culina_types::config::ChatConfig;
use culina_types::error::ChatError;
use culina_types::llm::{GenerationId, GenerationRequest, RuntimeError};

use crate::chat::callbacks::CallbackAdapter;
use crate::chat::memory::ConversationMemory;
use crate::chat::relay::{self, RelayReceiver, StreamFragment};
use crate::chat::summary;
use crate::runtime::LlmRuntime;
use crate::transcript::TranscriptRepository;

/// Capacity of the completion channel. Completions are one per generation,
/// so a handful of slots covers any burst of cancelled stragglers.
const COMPLETION_CHANNEL_CAPACITY: usize = 8;

/// Lifecycle of the coordinator's current generation.
///
/// Exactly one generation may be `Streaming` at a time. `Completed` and
/// `Cancelled` are transitional; the coordinator returns to `Idle` in the
/// same call that enters them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    Preparing,
    Streaming,
    Completed,
    Cancelled,
}

impl GenerationState {
    fn is_active(self) -> bool {
        matches!(self, GenerationState::Preparing | GenerationState::Streaming)
    }
}

/// Result of a background generation task, fenced by generation id.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub generation_id: GenerationId,
    pub result: Result<String, RuntimeError>,
}

/// An event for the UI loop: either a streamed token fragment or the
/// completion of a generation. Both carry the generation id; the consumer
/// must discard events whose id is not the currently active one.
#[derive(Debug)]
pub enum PipelineEvent {
    Fragment(StreamFragment),
    Completed(GenerationOutcome),
}

/// The prompt/display pair of the in-flight turn, kept until reconciliation.
#[derive(Debug, Clone)]
struct PendingTurn {
    prompt: String,
    display: String,
}

/// Orchestrates the full generation lifecycle against an LLM runtime and a
/// transcript store.
///
/// Generic over the runtime and repository ports so tests can substitute
/// scripted doubles (culina-core never depends on culina-infra).
pub struct GenerationCoordinator<R, T> {
    runtime: Arc<R>,
    transcripts: Arc<T>,
    config: Arc<ChatConfig>,
    installed_models: Vec<String>,

    memory: ConversationMemory,
    session_id: Option<Uuid>,

    state: GenerationState,
    generation_seq: GenerationId,
    cancel: CancellationToken,
    relay_rx: RelayReceiver,
    pending: Option<PendingTurn>,

    completion_tx: mpsc::Sender<GenerationOutcome>,
    completion_rx: mpsc::Receiver<GenerationOutcome>,
}

impl<R, T> GenerationCoordinator<R, T>
where
    R: LlmRuntime + 'static,
    T: TranscriptRepository + 'static,
{
    /// Create a coordinator bound to a runtime and transcript store.
    ///
    /// `installed_models` is the runtime host's known-installed set,
    /// queried once at startup; `set_model` validates against it.
    pub fn new(
        runtime: R,
        transcripts: Arc<T>,
        config: Arc<ChatConfig>,
        installed_models: Vec<String>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_CHANNEL_CAPACITY);
        Self {
            runtime: Arc::new(runtime),
            transcripts,
            config,
            installed_models,
            memory: ConversationMemory::new(),
            session_id: None,
            state: GenerationState::Idle,
            generation_seq: 0,
            cancel: CancellationToken::new(),
            relay_rx: RelayReceiver::closed(),
            pending: None,
            completion_tx,
            completion_rx,
        }
    }

    // --- Accessors ---

    pub fn state(&self) -> GenerationState {
        self.state
    }

    /// Id of the most recently dispatched generation. Events tagged with
    /// any other id are stale and must be ignored.
    pub fn current_generation(&self) -> GenerationId {
        self.generation_seq
    }

    pub fn is_generating(&self) -> bool {
        self.state.is_active()
    }

    pub fn model(&self) -> &str {
        self.runtime.model()
    }

    pub fn installed_models(&self) -> &[String] {
        &self.installed_models
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    // --- Lifecycle ---

    /// Prepare a new turn: validate input, lazily create a session, append
    /// the user's turn to memory, and persist it.
    ///
    /// Runs to completion on the caller's task before any background work
    /// is spawned, so the next render already shows the user's turn. A
    /// still-streaming previous generation is cancelled first, preserving
    /// the at-most-one-live-generation guarantee.
    pub async fn prepare(&mut self, display_text: &str) -> Result<(), ChatError> {
        if display_text.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }

        if self.state.is_active() {
            self.cancel();
        }

        if self.session_id.is_none() {
            debug!("no session active, creating one");
            self.new_session().await?;
        }

        self.memory.push(TranscriptEntry::human(display_text));
        self.persist(MessageRole::Human, display_text).await;

        self.state = GenerationState::Preparing;
        Ok(())
    }

    /// Dispatch the prepared turn: assign the next generation id, install a
    /// fresh relay and cancellation token, and spawn the runtime call.
    ///
    /// `prompt_text` is what the runtime sees (it replaces the display text
    /// in memory for the duration of the generation); `display_text` is
    /// restored by reconciliation when the generation finishes. A fresh
    /// [`CallbackAdapter`] is built for every generation, so filter state
    /// can never carry over from a previous run.
    pub fn dispatch(&mut self, prompt_text: String, display_text: String) -> GenerationId {
        self.generation_seq += 1;
        let id = self.generation_seq;

        if prompt_text != display_text {
            self.memory.rewrite_last_human(&prompt_text);
        }

        let (sender, receiver) = relay::channel(self.config.relay_capacity, id);
        self.relay_rx = receiver;
        self.cancel = CancellationToken::new();
        self.pending = Some(PendingTurn {
            prompt: prompt_text,
            display: display_text,
        });
        self.state = GenerationState::Streaming;

        let request = GenerationRequest {
            model: self.runtime.model().to_string(),
            messages: self.memory.snapshot(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let runtime = Arc::clone(&self.runtime);
        let cancel = self.cancel.clone();
        let completion = self.completion_tx.clone();
        tokio::spawn(async move {
            let adapter = CallbackAdapter::new(sender);
            let result = runtime.generate(request, &adapter, cancel).await;
            // The receiver only disappears when the coordinator itself is
            // gone, in which case there is nobody left to tell.
            let _ = completion
                .send(GenerationOutcome {
                    generation_id: id,
                    result,
                })
                .await;
        });

        debug!(generation = id, "generation dispatched");
        id
    }

    /// Wait for the next pipeline event: a relay fragment or a completion.
    ///
    /// Intended for the UI loop's select branch while a generation is
    /// active; fencing is still the caller's job for fragments.
    ///
    /// Biased toward the relay so buffered tail fragments are always
    /// drained before the completion that follows them is reported.
    pub async fn next_event(&mut self) -> PipelineEvent {
        loop {
            tokio::select! {
                biased;
                fragment = self.relay_rx.recv() => match fragment {
                    Some(fragment) => return PipelineEvent::Fragment(fragment),
                    None => {
                        // The producer is done; only a completion can follow.
                        if let Some(outcome) = self.completion_rx.recv().await {
                            return PipelineEvent::Completed(outcome);
                        }
                    }
                },
                Some(outcome) = self.completion_rx.recv() => {
                    return PipelineEvent::Completed(outcome);
                }
            }
        }
    }

    /// Apply a generation outcome on the UI task.
    ///
    /// Stale outcomes (wrong id, or no generation streaming) are dropped
    /// and yield `None`. Otherwise: memory is reconciled (the augmented
    /// prompt is replaced with the compact display text), the assistant
    /// entry is appended and persisted, a best-effort summary update is
    /// spawned, and the response text is returned. A runtime error is
    /// logged and surfaces as an empty response so the caller treats it as
    /// "no answer" rather than crashing.
    pub async fn finalize(&mut self, outcome: GenerationOutcome) -> Option<String> {
        if outcome.generation_id != self.generation_seq
            || self.state != GenerationState::Streaming
        {
            debug!(
                generation = outcome.generation_id,
                active = self.generation_seq,
                "dropping stale generation outcome"
            );
            return None;
        }

        self.state = GenerationState::Completed;
        let pending = self.pending.take();

        let response = match outcome.result {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, generation = outcome.generation_id, "generation failed");
                String::new()
            }
        };

        // Reconciliation: the memory held the augmented prompt during the
        // generation; swap the compact display text back in so the
        // persisted transcript stays what the user actually typed.
        if let Some(turn) = &pending {
            if turn.prompt != turn.display {
                self.memory.rewrite_last_human(&turn.display);
            }
        }

        if !response.is_empty() {
            self.memory.push(TranscriptEntry::assistant(&response));
            self.persist(MessageRole::Assistant, &response).await;
            self.spawn_summary_update();
        }

        self.state = GenerationState::Idle;
        Some(response)
    }

    /// Cancel the in-flight generation, if any. Idempotent.
    ///
    /// Signals the cancellation token, swaps in a fresh relay and token so
    /// no further fragment can be misdelivered, retires the old receiver
    /// into a drain task, and reconciles memory back to the display text.
    /// The runtime call itself may take a moment to observe the token;
    /// only the delivery path is severed immediately.
    pub fn cancel(&mut self) {
        if !self.state.is_active() {
            return;
        }
        self.state = GenerationState::Cancelled;
        debug!(generation = self.generation_seq, "cancelling generation");

        self.cancel.cancel();
        self.cancel = CancellationToken::new();

        let old = std::mem::replace(&mut self.relay_rx, RelayReceiver::closed());
        old.retire();

        if let Some(turn) = self.pending.take() {
            if turn.prompt != turn.display {
                self.memory.rewrite_last_human(&turn.display);
            }
        }

        self.state = GenerationState::Idle;
    }

    /// Switch the runtime to another installed model, preserving memory.
    pub fn set_model(&mut self, name: &str) -> Result<(), ChatError> {
        if !self.installed_models.iter().any(|m| m == name) {
            return Err(ChatError::ModelNotInstalled(name.to_string()));
        }
        self.runtime = Arc::new(self.runtime.with_model(name));
        debug!(model = name, "runtime rebuilt for new model");
        Ok(())
    }

    // --- Session lifecycle ---

    /// Start a fresh session: clear memory, create the session record, and
    /// seed the configured system prompt.
    pub async fn new_session(&mut self) -> Result<Uuid, ChatError> {
        if self.state.is_active() {
            self.cancel();
        }
        self.memory.clear();

        let session = ChatSession::new(self.runtime.model().to_string());
        self.transcripts
            .create_session(&session)
            .await
            .map_err(|e| ChatError::SessionCreationFailed(e.to_string()))?;
        self.session_id = Some(session.id);

        self.memory
            .push(TranscriptEntry::system(&self.config.system_prompt));
        self.persist(MessageRole::System, &self.config.system_prompt)
            .await;

        debug!(session = %session.id, "session created");
        Ok(session.id)
    }

    /// Load a persisted session into memory, restoring the model the
    /// session was recorded with when it is still installed.
    pub async fn load_session(&mut self, session_id: Uuid) -> Result<(), ChatError> {
        if self.state.is_active() {
            self.cancel();
        }

        let messages = self
            .transcripts
            .get_messages(&session_id)
            .await
            .map_err(|e| ChatError::SessionLoadFailed(e.to_string()))?;

        if let Some(first) = messages.first() {
            if first.model != self.runtime.model() {
                match self.set_model(&first.model.clone()) {
                    Ok(()) => {}
                    Err(err) => {
                        warn!(error = %err, "session model unavailable, keeping current model");
                    }
                }
            }
        }

        self.memory
            .replace_all(messages.iter().map(|m| m.to_entry()).collect());
        self.session_id = Some(session_id);
        debug!(session = %session_id, messages = self.memory.len(), "session loaded");
        Ok(())
    }

    /// Drop the active session and transcript without deleting anything
    /// persisted. The next prepared turn creates a fresh session.
    pub fn reset_session(&mut self) {
        if self.state.is_active() {
            self.cancel();
        }
        self.memory.clear();
        self.session_id = None;
    }

    /// The keyword summary of the active session, if one has been stored.
    pub async fn session_summary(&self) -> Option<String> {
        let session_id = self.session_id?;
        match self.transcripts.get_session(&session_id).await {
            Ok(session) => session.and_then(|s| s.summary),
            Err(err) => {
                warn!(error = %err, "failed to read session summary");
                None
            }
        }
    }

    // --- Internal helpers ---

    /// Persist a transcript message, best-effort. A failed save is logged
    /// and never blocks the in-memory conversation from proceeding.
    async fn persist(&self, role: MessageRole, content: &str) {
        let Some(session_id) = self.session_id else {
            return;
        };
        let message = SessionMessage::new(session_id, role, content, self.runtime.model());
        if let Err(err) = self.transcripts.save_message(&message).await {
            warn!(error = %err, %role, "failed to persist transcript message");
        }
    }

    /// Fire-and-forget session summary refresh after a completed exchange.
    fn spawn_summary_update(&self) {
        let Some(session_id) = self.session_id else {
            return;
        };
        let runtime = Arc::clone(&self.runtime);
        let transcripts = Arc::clone(&self.transcripts);
        let config = Arc::clone(&self.config);
        let transcript = self.memory.snapshot();
        tokio::spawn(async move {
            summary::update_session_summary(
                runtime.as_ref(),
                transcripts.as_ref(),
                &config,
                session_id,
                &transcript,
            )
            .await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::time::Duration;

    use culina_types::error::RepositoryError;

    use crate::runtime::RuntimeHandler;

    /// Runtime double that streams scripted chunks and returns a fixed
    /// response. When `block_until_cancelled` is set, it streams its
    /// chunks and then parks until the token fires.
    #[derive(Clone)]
    struct ScriptedRuntime {
        model: String,
        chunks: Vec<String>,
        response: String,
        block_until_cancelled: bool,
        fail: bool,
    }

    impl ScriptedRuntime {
        fn answering(response: &str) -> Self {
            Self {
                model: "gemma3:4b".to_string(),
                chunks: vec![format!("AI: {response}")],
                response: response.to_string(),
                block_until_cancelled: false,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                model: "gemma3:4b".to_string(),
                chunks: Vec::new(),
                response: String::new(),
                block_until_cancelled: false,
                fail: true,
            }
        }

        fn hanging(chunks: &[&str]) -> Self {
            Self {
                model: "gemma3:4b".to_string(),
                chunks: chunks.iter().map(|c| c.to_string()).collect(),
                response: String::new(),
                block_until_cancelled: true,
                fail: false,
            }
        }
    }

    impl LlmRuntime for ScriptedRuntime {
        fn model(&self) -> &str {
            &self.model
        }

        async fn generate<H: RuntimeHandler>(
            &self,
            _request: GenerationRequest,
            handler: &H,
            cancel: CancellationToken,
        ) -> Result<String, RuntimeError> {
            handler.on_run_start();
            for chunk in &self.chunks {
                handler.on_token(chunk).await;
            }
            if self.block_until_cancelled {
                cancel.cancelled().await;
                return Err(RuntimeError::Cancelled);
            }
            if self.fail {
                handler.on_error("scripted failure");
                return Err(RuntimeError::Runtime("scripted failure".to_string()));
            }
            handler.on_run_end();
            Ok(self.response.clone())
        }

        async fn installed_models(&self) -> Result<Vec<String>, RuntimeError> {
            Ok(vec![self.model.clone()])
        }

        fn with_model(&self, model: &str) -> Self {
            Self {
                model: model.to_string(),
                ..self.clone()
            }
        }
    }

    /// Transcript double recording every call.
    #[derive(Default)]
    struct RecordingTranscripts {
        sessions: Mutex<Vec<ChatSession>>,
        messages: Mutex<Vec<SessionMessage>>,
        summaries: Mutex<Vec<(Uuid, String)>>,
        fail_session_creation: bool,
    }

    impl TranscriptRepository for RecordingTranscripts {
        async fn create_session(&self, session: &ChatSession) -> Result<(), RepositoryError> {
            if self.fail_session_creation {
                return Err(RepositoryError::Connection);
            }
            self.sessions.lock().unwrap().push(session.clone());
            Ok(())
        }

        async fn get_session(
            &self,
            session_id: &Uuid,
        ) -> Result<Option<ChatSession>, RepositoryError> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.id == *session_id)
                .cloned())
        }

        async fn list_sessions(&self) -> Result<Vec<ChatSession>, RepositoryError> {
            Ok(self.sessions.lock().unwrap().clone())
        }

        async fn save_message(&self, message: &SessionMessage) -> Result<(), RepositoryError> {
            self.messages.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn get_messages(
            &self,
            session_id: &Uuid,
        ) -> Result<Vec<SessionMessage>, RepositoryError> {
            Ok(self
                .messages
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.session_id == *session_id)
                .cloned()
                .collect())
        }

        async fn update_summary(
            &self,
            session_id: &Uuid,
            summary: &str,
        ) -> Result<(), RepositoryError> {
            self.summaries
                .lock()
                .unwrap()
                .push((*session_id, summary.to_string()));
            Ok(())
        }
    }

    fn coordinator(
        runtime: ScriptedRuntime,
    ) -> (
        GenerationCoordinator<ScriptedRuntime, RecordingTranscripts>,
        Arc<RecordingTranscripts>,
    ) {
        let transcripts = Arc::new(RecordingTranscripts::default());
        let coordinator = GenerationCoordinator::new(
            runtime,
            Arc::clone(&transcripts),
            Arc::new(ChatConfig::default()),
            vec!["gemma3:4b".to_string(), "llama3.2:3b".to_string()],
        );
        (coordinator, transcripts)
    }

    /// Drive the coordinator until the given generation completes,
    /// collecting the fragments that pass the fencing check.
    async fn drive_to_completion(
        coordinator: &mut GenerationCoordinator<ScriptedRuntime, RecordingTranscripts>,
        id: GenerationId,
    ) -> (Vec<StreamFragment>, Option<String>) {
        let mut fragments = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), coordinator.next_event())
                .await
                .expect("pipeline event must arrive");
            match event {
                PipelineEvent::Fragment(fragment) => {
                    if fragment.generation_id == coordinator.current_generation() {
                        fragments.push(fragment);
                    }
                }
                PipelineEvent::Completed(outcome) => {
                    let stale = outcome.generation_id != id;
                    let response = coordinator.finalize(outcome).await;
                    if !stale {
                        return (fragments, response);
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_prepare_rejects_empty_input() {
        let (mut coordinator, _) = coordinator(ScriptedRuntime::answering("hi"));
        assert!(matches!(
            coordinator.prepare("").await,
            Err(ChatError::EmptyInput)
        ));
        assert!(matches!(
            coordinator.prepare("   ").await,
            Err(ChatError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn test_prepare_creates_session_lazily() {
        let (mut coordinator, transcripts) = coordinator(ScriptedRuntime::answering("hi"));
        assert!(coordinator.session_id().is_none());

        coordinator.prepare("hello").await.unwrap();

        assert!(coordinator.session_id().is_some());
        assert_eq!(transcripts.sessions.lock().unwrap().len(), 1);
        // System prompt + human turn, both in memory and persisted.
        assert_eq!(coordinator.memory().len(), 2);
        let persisted = transcripts.messages.lock().unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[0].role, MessageRole::System);
        assert_eq!(persisted[1].role, MessageRole::Human);
        assert_eq!(persisted[1].content, "hello");
    }

    #[tokio::test]
    async fn test_session_creation_failure_surfaces() {
        let transcripts = Arc::new(RecordingTranscripts {
            fail_session_creation: true,
            ..Default::default()
        });
        let mut coordinator = GenerationCoordinator::new(
            ScriptedRuntime::answering("hi"),
            transcripts,
            Arc::new(ChatConfig::default()),
            vec!["gemma3:4b".to_string()],
        );
        assert!(matches!(
            coordinator.prepare("hello").await,
            Err(ChatError::SessionCreationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_reconciliation_after_successful_generation() {
        let (mut coordinator, transcripts) = coordinator(ScriptedRuntime::answering("15 minutes"));
        let display = "How long to cook @[Pasta Carbonara]?";
        let prompt = format!("Recipe context here.\n\nUser message: {display}");

        coordinator.prepare(display).await.unwrap();
        let id = coordinator.dispatch(prompt, display.to_string());
        let (fragments, response) = drive_to_completion(&mut coordinator, id).await;

        assert_eq!(response.as_deref(), Some("15 minutes"));
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "15 minutes");

        // The last human entry is exactly the display text again.
        let last_human = coordinator
            .memory()
            .entries()
            .iter()
            .rev()
            .find(|e| e.role == MessageRole::Human)
            .unwrap();
        assert_eq!(last_human.content, display);

        // Assistant reply appended and persisted.
        let entries = coordinator.memory().entries();
        assert_eq!(entries.last().unwrap().role, MessageRole::Assistant);
        let persisted = transcripts.messages.lock().unwrap();
        assert_eq!(persisted.last().unwrap().role, MessageRole::Assistant);
        assert_eq!(persisted.last().unwrap().content, "15 minutes");
    }

    #[tokio::test]
    async fn test_runtime_error_yields_empty_response_with_current_id() {
        let (mut coordinator, _) = coordinator(ScriptedRuntime::failing());

        coordinator.prepare("hello").await.unwrap();
        let id = coordinator.dispatch("hello".to_string(), "hello".to_string());
        let (_, response) = drive_to_completion(&mut coordinator, id).await;

        // Empty response means "no answer": nothing appended, back to idle.
        assert_eq!(response.as_deref(), Some(""));
        assert_eq!(coordinator.state(), GenerationState::Idle);
        assert_eq!(
            coordinator.memory().entries().last().unwrap().role,
            MessageRole::Human
        );
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_when_idle() {
        let (mut coordinator, _) = coordinator(ScriptedRuntime::answering("hi"));
        coordinator.cancel();
        coordinator.cancel();
        assert_eq!(coordinator.state(), GenerationState::Idle);
    }

    #[tokio::test]
    async fn test_cancel_then_new_generation_never_delivers_stale_fragments() {
        let (mut coordinator, _) = coordinator(ScriptedRuntime::hanging(&["AI: stale answer"]));

        coordinator.prepare("first").await.unwrap();
        let first_id = coordinator.dispatch("first".to_string(), "first".to_string());

        // Let the hanging generation stream its fragment into the relay,
        // then cancel without ever consuming it.
        tokio::time::sleep(Duration::from_millis(20)).await;
        coordinator.cancel();
        assert_eq!(coordinator.state(), GenerationState::Idle);

        // A fast second generation right behind the cancel.
        coordinator.runtime = Arc::new(ScriptedRuntime::answering("fresh answer"));
        coordinator.prepare("second").await.unwrap();
        let second_id = coordinator.dispatch("second".to_string(), "second".to_string());
        assert!(second_id > first_id);

        let (fragments, response) = drive_to_completion(&mut coordinator, second_id).await;

        assert_eq!(response.as_deref(), Some("fresh answer"));
        assert!(fragments.iter().all(|f| f.generation_id == second_id));
        assert!(fragments.iter().all(|f| !f.text.contains("stale")));
    }

    #[tokio::test]
    async fn test_double_submission_produces_single_reply_tagged_second() {
        let (mut coordinator, _) = coordinator(ScriptedRuntime::hanging(&["AI: first reply"]));

        coordinator.prepare("hello").await.unwrap();
        coordinator.dispatch("hello".to_string(), "hello".to_string());
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Second submission: prepare cancels the live generation itself.
        coordinator.runtime = Arc::new(ScriptedRuntime::answering("second reply"));
        coordinator.prepare("hello").await.unwrap();
        let second_id = coordinator.dispatch("hello".to_string(), "hello".to_string());

        let (_, response) = drive_to_completion(&mut coordinator, second_id).await;
        assert_eq!(response.as_deref(), Some("second reply"));

        // Exactly one assistant entry in the transcript.
        let assistant_count = coordinator
            .memory()
            .entries()
            .iter()
            .filter(|e| e.role == MessageRole::Assistant)
            .count();
        assert_eq!(assistant_count, 1);
        assert_eq!(
            coordinator.memory().entries().last().unwrap().content,
            "second reply"
        );
    }

    #[tokio::test]
    async fn test_cancel_reconciles_display_text() {
        let (mut coordinator, _) = coordinator(ScriptedRuntime::hanging(&[]));

        let display = "ask about @[Pasta Carbonara]";
        let prompt = format!("big expanded context\n\nUser message: {display}");
        coordinator.prepare(display).await.unwrap();
        coordinator.dispatch(prompt, display.to_string());
        coordinator.cancel();

        let last_human = coordinator
            .memory()
            .entries()
            .iter()
            .rev()
            .find(|e| e.role == MessageRole::Human)
            .unwrap();
        assert_eq!(last_human.content, display);
    }

    #[tokio::test]
    async fn test_set_model_rejects_unknown() {
        let (mut coordinator, _) = coordinator(ScriptedRuntime::answering("hi"));
        let err = coordinator.set_model("mistral:7b").unwrap_err();
        assert!(matches!(err, ChatError::ModelNotInstalled(_)));
        assert_eq!(coordinator.model(), "gemma3:4b");
    }

    #[tokio::test]
    async fn test_set_model_rebuilds_runtime_preserving_memory() {
        let (mut coordinator, _) = coordinator(ScriptedRuntime::answering("hi"));
        coordinator.prepare("hello").await.unwrap();
        let entries_before = coordinator.memory().len();

        coordinator.set_model("llama3.2:3b").unwrap();

        assert_eq!(coordinator.model(), "llama3.2:3b");
        assert_eq!(coordinator.memory().len(), entries_before);
    }

    #[tokio::test]
    async fn test_load_session_restores_transcript_and_model() {
        let (mut coordinator, transcripts) = coordinator(ScriptedRuntime::answering("hi"));

        // Persist a session under a different installed model.
        let session = ChatSession::new("llama3.2:3b".to_string());
        transcripts.create_session(&session).await.unwrap();
        for (role, content) in [
            (MessageRole::System, "be helpful"),
            (MessageRole::Human, "hi"),
            (MessageRole::Assistant, "hello!"),
        ] {
            transcripts
                .save_message(&SessionMessage::new(session.id, role, content, "llama3.2:3b"))
                .await
                .unwrap();
        }

        coordinator.load_session(session.id).await.unwrap();

        assert_eq!(coordinator.session_id(), Some(session.id));
        assert_eq!(coordinator.memory().len(), 3);
        assert_eq!(coordinator.model(), "llama3.2:3b");
    }

    #[tokio::test]
    async fn test_summary_update_fires_after_generation() {
        let (mut coordinator, transcripts) = coordinator(ScriptedRuntime::answering("an answer"));

        coordinator.prepare("hello").await.unwrap();
        let id = coordinator.dispatch("hello".to_string(), "hello".to_string());
        drive_to_completion(&mut coordinator, id).await;

        // The summary task is fire-and-forget; give it a beat.
        for _ in 0..50 {
            if !transcripts.summaries.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let summaries = transcripts.summaries.lock().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].0, coordinator.session_id().unwrap());
        assert_eq!(summaries[0].1, "an answer");
    }

    #[tokio::test]
    async fn test_reset_session_clears_state() {
        let (mut coordinator, _) = coordinator(ScriptedRuntime::answering("hi"));
        coordinator.prepare("hello").await.unwrap();
        coordinator.reset_session();
        assert!(coordinator.session_id().is_none());
        assert!(coordinator.memory().is_empty());
    }
}
