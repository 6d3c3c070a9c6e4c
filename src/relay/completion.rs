//! Stateless chat-completion backend
//!
//! Every call resends the hidden instruction followed by the full history.

use super::{ChatBackend, RelayTurn};
use crate::conditions::Condition;
use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmService};
use crate::state_machine::Transcript;
use async_trait::async_trait;
use std::sync::Arc;

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 400;

pub struct CompletionBackend {
    llm: Arc<dyn LlmService>,
}

impl CompletionBackend {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }

    fn build_request(condition: &Condition, transcript: &Transcript) -> LlmRequest {
        LlmRequest {
            system: Some(condition.hidden_instruction.clone()),
            messages: transcript
                .iter()
                .map(|turn| LlmMessage::new(turn.role.into(), turn.content.clone()))
                .collect(),
            temperature: Some(TEMPERATURE),
            max_tokens: Some(MAX_TOKENS),
        }
    }
}

#[async_trait]
impl ChatBackend for CompletionBackend {
    async fn respond(&self, turn: RelayTurn<'_>) -> Result<String, LlmError> {
        let request = Self::build_request(turn.condition, turn.transcript);

        tokio::select! {
            () = turn.cancel.cancelled() => Err(LlmError::cancelled("Completion request cancelled")),
            result = self.llm.complete(&request) => result.map(|response| response.text),
        }
    }

    fn name(&self) -> &'static str {
        "completion"
    }
}
