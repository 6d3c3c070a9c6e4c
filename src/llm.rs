//! AI service abstraction
//!
//! Two integration shapes are consumed: stateless chat completion
//! ([`LlmService`]) and the run-based assistants conversation
//! ([`AssistantsApi`]).

mod assistants;
mod error;
mod openai;
mod types;

pub use assistants::OpenAIAssistants;
pub use error::{LlmError, LlmErrorKind};
pub use openai::OpenAIService;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Stateless chat completion
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Run-based conversation API with server-side threads
#[async_trait]
pub trait AssistantsApi: Send + Sync {
    /// Create a new, empty conversation thread
    async fn create_thread(&self) -> Result<ThreadHandle, LlmError>;

    /// Append a user message to a thread
    async fn add_user_message(&self, thread: &ThreadHandle, text: &str) -> Result<(), LlmError>;

    /// Start a run of `assistant_id` over the thread
    async fn start_run(
        &self,
        thread: &ThreadHandle,
        assistant_id: &str,
        additional_instructions: Option<&str>,
    ) -> Result<RunHandle, LlmError>;

    /// Fetch the current status of a run
    async fn run_status(&self, thread: &ThreadHandle, run: &RunHandle)
        -> Result<RunSnapshot, LlmError>;

    /// Ask the server to stop a run that has not finished
    async fn cancel_run(&self, thread: &ThreadHandle, run: &RunHandle) -> Result<(), LlmError>;

    /// Text of the newest assistant message in the thread
    async fn latest_assistant_message(&self, thread: &ThreadHandle) -> Result<String, LlmError>;
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    messages = request.messages.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Completion request finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    retryable = e.kind.is_retryable(),
                    "Completion request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[async_trait]
impl<T: LlmService + ?Sized> LlmService for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

#[async_trait]
impl<T: AssistantsApi + ?Sized> AssistantsApi for Arc<T> {
    async fn create_thread(&self) -> Result<ThreadHandle, LlmError> {
        (**self).create_thread().await
    }

    async fn add_user_message(&self, thread: &ThreadHandle, text: &str) -> Result<(), LlmError> {
        (**self).add_user_message(thread, text).await
    }

    async fn start_run(
        &self,
        thread: &ThreadHandle,
        assistant_id: &str,
        additional_instructions: Option<&str>,
    ) -> Result<RunHandle, LlmError> {
        (**self)
            .start_run(thread, assistant_id, additional_instructions)
            .await
    }

    async fn run_status(
        &self,
        thread: &ThreadHandle,
        run: &RunHandle,
    ) -> Result<RunSnapshot, LlmError> {
        (**self).run_status(thread, run).await
    }

    async fn cancel_run(&self, thread: &ThreadHandle, run: &RunHandle) -> Result<(), LlmError> {
        (**self).cancel_run(thread, run).await
    }

    async fn latest_assistant_message(&self, thread: &ThreadHandle) -> Result<String, LlmError> {
        (**self).latest_assistant_message(thread).await
    }
}
