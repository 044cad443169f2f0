//! LlmRuntime and RuntimeHandler trait definitions.
//!
//! `LlmRuntime` is the port to the model runtime (implemented in
//! culina-infra by `OllamaRuntime`). `RuntimeHandler` is the small closed
//! interface of runtime events the pipeline consumes; the runtime invokes
//! it while a generation is in flight.
//!
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use tokio_util::sync::CancellationToken;

use culina_types::llm::{GenerationRequest, RuntimeError};

/// Receiver for runtime events during a generation.
///
/// All hooks except `on_token` are informational; implementations log them
/// as status updates. `on_token` carries raw streamed chunks and is async
/// so a bounded downstream conduit can exert backpressure on the runtime.
pub trait RuntimeHandler: Send + Sync {
    /// The runtime started processing the request.
    fn on_run_start(&self);

    /// The runtime finished processing the request.
    fn on_run_end(&self);

    /// The runtime reported an error.
    fn on_error(&self, message: &str);

    /// A tool invocation started.
    fn on_tool_start(&self, name: &str);

    /// A tool invocation finished.
    fn on_tool_end(&self, output_len: usize);

    /// A raw token chunk was streamed from the model.
    fn on_token(&self, chunk: &str) -> impl std::future::Future<Output = ()> + Send;
}

/// Trait for LLM runtime backends.
///
/// `generate` blocks (within its task) until the runtime produces the full
/// response, emitting `RuntimeHandler` events along the way. The call must
/// observe `cancel` and abort with [`RuntimeError::Cancelled`] promptly
/// once the token is triggered.
///
/// Implementations live in culina-infra (e.g., `OllamaRuntime`).
pub trait LlmRuntime: Send + Sync {
    /// The model this runtime instance is bound to.
    fn model(&self) -> &str;

    /// Run one generation to completion, streaming events into `handler`.
    fn generate<H: RuntimeHandler>(
        &self,
        request: GenerationRequest,
        handler: &H,
        cancel: CancellationToken,
    ) -> impl std::future::Future<Output = Result<String, RuntimeError>> + Send;

    /// List the models installed on the runtime host.
    fn installed_models(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RuntimeError>> + Send;

    /// Rebuild this runtime bound to a different model, keeping everything
    /// else (endpoint, transport) unchanged.
    fn with_model(&self, model: &str) -> Self
    where
        Self: Sized;
}
