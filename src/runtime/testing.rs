//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use crate::conditions::ConditionId;
use crate::llm::{
    AssistantsApi, LlmError, LlmRequest, LlmResponse, LlmService, RunHandle, RunSnapshot,
    RunStatus, ThreadHandle,
};
use crate::relay::{ChatBackend, RelayTurn};
use crate::state_machine::ChatTurn;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock completion service that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    delay: Option<Duration>,
    requests: Mutex<Vec<LlmRequest>>,
}

#[allow(dead_code)]
impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Mock Chat Backend
// ============================================================================

/// What a backend was asked to answer
#[derive(Debug, Clone)]
pub struct RecordedTurn {
    pub condition: ConditionId,
    pub transcript: Vec<ChatTurn>,
}

/// Mock relay backend with queued replies
#[derive(Default)]
pub struct MockChatBackend {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    turns: Mutex<Vec<RecordedTurn>>,
    delay: Option<Duration>,
}

#[allow(dead_code)]
impl MockChatBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for cancellation or the delay before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_turns(&self) -> Vec<RecordedTurn> {
        self.turns.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn respond(&self, turn: RelayTurn<'_>) -> Result<String, LlmError> {
        self.turns.lock().unwrap().push(RecordedTurn {
            condition: turn.condition.id.clone(),
            transcript: turn.transcript.turns().to_vec(),
        });
        if let Some(delay) = self.delay {
            tokio::select! {
                () = turn.cancel.cancelled() => return Err(LlmError::cancelled("Mock cancelled")),
                () = tokio::time::sleep(delay) => {}
            }
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock reply queued")))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ============================================================================
// Mock Assistants API
// ============================================================================

#[derive(Default)]
struct AssistantsState {
    statuses: VecDeque<Result<RunStatus, LlmError>>,
    replies: VecDeque<String>,
    threads_created: u32,
    runs_started: Vec<(String, Option<String>)>,
    posted: Vec<String>,
    status_checks: u32,
    active_run: Option<String>,
    cancelled: Vec<String>,
    cancel_error: Option<LlmError>,
}

/// Mock assistants API
///
/// Run status checks pop from a queue and report `in_progress` once it is
/// empty, so a run with nothing queued never finishes. Like the real service,
/// a thread rejects new messages until its run is terminal or cancelled.
#[derive(Default)]
pub struct MockAssistants {
    state: Mutex<AssistantsState>,
}

#[allow(dead_code)]
impl MockAssistants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_statuses(&self, statuses: impl IntoIterator<Item = RunStatus>) {
        self.state
            .lock()
            .unwrap()
            .statuses
            .extend(statuses.into_iter().map(Ok));
    }

    pub fn queue_status_error(&self, error: LlmError) {
        self.state.lock().unwrap().statuses.push_back(Err(error));
    }

    pub fn queue_reply(&self, reply: &str) {
        self.state.lock().unwrap().replies.push_back(reply.to_string());
    }

    pub fn status_checks(&self) -> u32 {
        self.state.lock().unwrap().status_checks
    }

    pub fn threads_created(&self) -> u32 {
        self.state.lock().unwrap().threads_created
    }

    pub fn posted_messages(&self) -> Vec<String> {
        self.state.lock().unwrap().posted.clone()
    }

    /// Make the next `cancel_run` fail
    pub fn fail_next_cancel(&self, error: LlmError) {
        self.state.lock().unwrap().cancel_error = Some(error);
    }

    pub fn cancelled_runs(&self) -> Vec<String> {
        self.state.lock().unwrap().cancelled.clone()
    }

    /// `(assistant_id, additional_instructions)` for every run started
    pub fn started_runs(&self) -> Vec<(String, Option<String>)> {
        self.state.lock().unwrap().runs_started.clone()
    }
}

#[async_trait]
impl AssistantsApi for MockAssistants {
    async fn create_thread(&self) -> Result<ThreadHandle, LlmError> {
        let mut state = self.state.lock().unwrap();
        state.threads_created += 1;
        Ok(ThreadHandle(format!("thread_{}", state.threads_created)))
    }

    async fn add_user_message(&self, _thread: &ThreadHandle, text: &str) -> Result<(), LlmError> {
        let mut state = self.state.lock().unwrap();
        if let Some(run) = &state.active_run {
            return Err(LlmError::invalid_request(format!(
                "Can't add messages to thread while a run {run} is active"
            )));
        }
        state.posted.push(text.to_string());
        Ok(())
    }

    async fn start_run(
        &self,
        _thread: &ThreadHandle,
        assistant_id: &str,
        additional_instructions: Option<&str>,
    ) -> Result<RunHandle, LlmError> {
        let mut state = self.state.lock().unwrap();
        state.runs_started.push((
            assistant_id.to_string(),
            additional_instructions.map(str::to_string),
        ));
        let run = format!("run_{}", state.runs_started.len());
        state.active_run = Some(run.clone());
        Ok(RunHandle(run))
    }

    async fn run_status(
        &self,
        _thread: &ThreadHandle,
        _run: &RunHandle,
    ) -> Result<RunSnapshot, LlmError> {
        let mut state = self.state.lock().unwrap();
        state.status_checks += 1;
        let status = state.statuses.pop_front().unwrap_or(Ok(RunStatus::InProgress))?;
        if status.is_terminal() {
            state.active_run = None;
        }
        let last_error = matches!(status, RunStatus::Failed)
            .then(|| "server_error: mock failure".to_string());
        Ok(RunSnapshot { status, last_error })
    }

    async fn cancel_run(&self, _thread: &ThreadHandle, run: &RunHandle) -> Result<(), LlmError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.cancel_error.take() {
            return Err(error);
        }
        if state.active_run.as_deref() == Some(run.as_str()) {
            state.active_run = None;
        }
        state.cancelled.push(run.as_str().to_string());
        Ok(())
    }

    async fn latest_assistant_message(&self, _thread: &ThreadHandle) -> Result<String, LlmError> {
        self.state
            .lock()
            .unwrap()
            .replies
            .pop_front()
            .ok_or_else(|| LlmError::unknown("No mock reply queued"))
    }
}
