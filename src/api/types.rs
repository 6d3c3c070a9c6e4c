//! API request and response types

use crate::conditions::ConditionId;
use crate::export::ExportFormat;
use crate::runtime::{ParticipantView, SessionStatus};
use crate::state_machine::Phase;
use serde::{Deserialize, Serialize};

/// Participant login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub participant_id: String,
}

/// Message to the AI partner
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Draft autosave
#[derive(Debug, Deserialize)]
pub struct StoryDraftRequest {
    pub text: String,
}

/// Final story submission
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub story: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub view: ParticipantView,
}

/// Forced phase transition
#[derive(Debug, Deserialize)]
pub struct PhaseOverrideRequest {
    pub phase: Phase,
}

#[derive(Debug, Deserialize)]
pub struct ConditionOverrideRequest {
    pub condition: ConditionId,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionStatus>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            retryable: None,
        }
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            retryable: Some(true),
        }
    }
}
