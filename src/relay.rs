//! Chat relay between the participant and the AI partner
//!
//! The relay owns the transcript discipline: the user turn is appended
//! before the backend is called and stays there if the call fails; the
//! assistant turn is appended only on success.

mod completion;
mod poll;
mod threaded;

pub use completion::CompletionBackend;
pub use poll::PollPolicy;
pub use threaded::{AssistantDirectory, ThreadedBackend};

use crate::conditions::{Condition, ConditionCatalog, ConditionId};
use crate::llm::{LlmError, ThreadHandle};
use crate::state_machine::{ChatTurn, Phase, Session, Transcript};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Everything a backend needs for one exchange
pub struct RelayTurn<'a> {
    pub condition: &'a Condition,
    /// Full transcript, ending with the new user turn
    pub transcript: &'a Transcript,
    /// Server-side conversation handle, created on first use by backends that need one
    pub thread: &'a mut Option<ThreadHandle>,
    pub cancel: &'a CancellationToken,
}

/// An external AI integration style
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Produce the assistant reply for the transcript's last user turn
    async fn respond(&self, turn: RelayTurn<'_>) -> Result<String, LlmError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Message must not be empty")]
    EmptyMessage,
    #[error("Chat is not available during the {0} phase")]
    PhaseClosed(Phase),
    #[error("No condition has been assigned to this session")]
    NoCondition,
    #[error("Unknown condition: {0}")]
    UnknownCondition(ConditionId),
    #[error("AI service error: {0}")]
    Upstream(#[from] LlmError),
}

/// Forwards participant messages to the configured backend
#[derive(Clone)]
pub struct ChatRelay {
    backend: Arc<dyn ChatBackend>,
}

impl ChatRelay {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Relay one participant message and return the assistant reply
    pub async fn send(
        &self,
        session: &mut Session,
        catalog: &ConditionCatalog,
        message: String,
        cancel: &CancellationToken,
    ) -> Result<String, RelayError> {
        if message.trim().is_empty() {
            return Err(RelayError::EmptyMessage);
        }
        if !session.phase().accepts_chat() {
            return Err(RelayError::PhaseClosed(session.phase()));
        }
        let condition_id = session.condition().ok_or(RelayError::NoCondition)?;
        let condition = catalog
            .get(condition_id)
            .ok_or_else(|| RelayError::UnknownCondition(condition_id.clone()))?;

        session.record_turn(ChatTurn::user(message));

        let start = Instant::now();
        let (transcript, thread) = session.relay_parts();
        let turns = transcript.len();
        let result = self
            .backend
            .respond(RelayTurn {
                condition,
                transcript,
                thread,
                cancel,
            })
            .await;

        match result {
            Ok(reply) => {
                tracing::info!(
                    backend = self.backend.name(),
                    condition = %condition.id,
                    turns,
                    duration_ms = %start.elapsed().as_millis(),
                    "Relayed chat message"
                );
                session.record_turn(ChatTurn::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    condition = %condition.id,
                    turns,
                    duration_ms = %start.elapsed().as_millis(),
                    kind = ?e.kind,
                    error = %e.message,
                    "Chat relay failed; user turn kept"
                );
                Err(RelayError::Upstream(e))
            }
        }
    }
}
