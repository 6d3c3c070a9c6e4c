//! Threaded (assistants run) backend
//!
//! A server-side thread is created on the first message of a session and
//! reused afterwards; only the newest user turn is sent each time.

use super::poll::{wait_for_run, PollPolicy};
use super::{ChatBackend, RelayTurn};
use crate::conditions::Persona;
use crate::llm::{AssistantsApi, LlmError, LlmErrorKind, RunHandle, RunStatus, ThreadHandle};
use crate::state_machine::Role;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Assistant identity configured for each persona
#[derive(Debug, Clone, Default)]
pub struct AssistantDirectory {
    by_persona: HashMap<Persona, String>,
}

impl AssistantDirectory {
    pub fn new(strategic: impl Into<String>, baseline: impl Into<String>) -> Self {
        let mut by_persona = HashMap::new();
        by_persona.insert(Persona::Strategic, strategic.into());
        by_persona.insert(Persona::Baseline, baseline.into());
        Self { by_persona }
    }

    pub fn get(&self, persona: Persona) -> Option<&str> {
        self.by_persona.get(&persona).map(String::as_str)
    }
}

pub struct ThreadedBackend {
    api: Arc<dyn AssistantsApi>,
    assistants: AssistantDirectory,
    policy: PollPolicy,
}

impl ThreadedBackend {
    pub fn new(api: Arc<dyn AssistantsApi>, assistants: AssistantDirectory, policy: PollPolicy) -> Self {
        Self {
            api,
            assistants,
            policy,
        }
    }

    async fn thread_for(&self, slot: &mut Option<ThreadHandle>) -> Result<ThreadHandle, LlmError> {
        if let Some(thread) = slot {
            return Ok(thread.clone());
        }
        let thread = self.api.create_thread().await?;
        *slot = Some(thread.clone());
        Ok(thread)
    }

    /// Stop a run nobody is waiting for; the thread stays locked until it ends
    async fn abandon_run(&self, thread: &ThreadHandle, run: &RunHandle) {
        match self.api.cancel_run(thread, run).await {
            Ok(()) => tracing::info!(run_id = run.as_str(), "Cancelled abandoned run"),
            Err(e) => tracing::warn!(
                run_id = run.as_str(),
                error = %e,
                "Failed to cancel abandoned run"
            ),
        }
    }
}

#[async_trait]
impl ChatBackend for ThreadedBackend {
    async fn respond(&self, turn: RelayTurn<'_>) -> Result<String, LlmError> {
        let message = turn
            .transcript
            .turns()
            .last()
            .filter(|t| t.role == Role::User)
            .ok_or_else(|| LlmError::invalid_request("Transcript does not end with a user turn"))?;

        let assistant_id = self.assistants.get(turn.condition.persona).ok_or_else(|| {
            LlmError::invalid_request(format!(
                "No assistant configured for persona {:?}",
                turn.condition.persona
            ))
        })?;

        let thread = self.thread_for(turn.thread).await?;
        self.api.add_user_message(&thread, &message.content).await?;
        let run = self
            .api
            .start_run(&thread, assistant_id, Some(&turn.condition.hidden_instruction))
            .await?;

        let waited = wait_for_run(self.api.as_ref(), &thread, &run, &self.policy, turn.cancel).await;
        let snapshot = match waited {
            Ok(snapshot) => snapshot,
            Err(e) => {
                if matches!(e.kind, LlmErrorKind::Timeout | LlmErrorKind::Cancelled) {
                    self.abandon_run(&thread, &run).await;
                }
                return Err(e);
            }
        };

        match snapshot.status {
            RunStatus::Completed => self.api.latest_assistant_message(&thread).await,
            status => {
                let detail = snapshot
                    .last_error
                    .unwrap_or_else(|| "no error detail".to_string());
                Err(LlmError::run_failed(format!(
                    "Run ended with status {status:?}: {detail}"
                )))
            }
        }
    }

    fn name(&self) -> &'static str {
        "threaded"
    }
}
