//! Read models handed to participants and researchers

use super::store::SessionId;
use crate::conditions::{ConditionCatalog, ConditionId};
use crate::state_machine::{Phase, Session, Transcript};
use crate::survey::{handoff_url, read_timer, TimerReading};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Serialize;

/// What the participant's page may show
///
/// Never carries the hidden instruction or the condition label.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantView {
    pub session_id: SessionId,
    pub phase: Phase,
    pub participant_id: Option<String>,
    pub guide_text: Option<String>,
    pub transcript: Transcript,
    pub story_text: String,
    pub word_count: usize,
    pub timer: Option<TimerReading>,
    /// Present only once the story is submitted
    pub survey_url: Option<String>,
}

impl ParticipantView {
    pub fn build(
        id: SessionId,
        session: &Session,
        catalog: &ConditionCatalog,
        survey_base: &Url,
        now: DateTime<Utc>,
    ) -> Self {
        let guide_text = session
            .condition()
            .and_then(|c| catalog.get(c))
            .map(|c| c.guide_text.clone());

        let survey_url = match (session.phase(), session.participant_id(), session.condition()) {
            (Phase::Submission, Some(pid), Some(condition)) => {
                Some(handoff_url(survey_base, pid, condition).to_string())
            }
            _ => None,
        };

        Self {
            session_id: id,
            phase: session.phase(),
            participant_id: session.participant_id().map(str::to_string),
            guide_text,
            transcript: session.transcript().clone(),
            story_text: session.story_text().to_string(),
            word_count: session.story_word_count(),
            timer: read_timer(session.phase(), session.phase_started_at(), now),
            survey_url,
        }
    }
}

/// Researcher status readout
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub participant_id: Option<String>,
    pub condition: Option<ConditionId>,
    pub condition_label: Option<String>,
    pub phase: Phase,
    pub phase_started_at: DateTime<Utc>,
    pub chat_turns: usize,
    pub word_count: usize,
    pub thread_id: Option<String>,
    /// A chat reply is in flight; the other fields are as of when it started
    pub busy: bool,
}

impl SessionStatus {
    pub fn build(
        id: SessionId,
        created_at: DateTime<Utc>,
        session: &Session,
        catalog: &ConditionCatalog,
    ) -> Self {
        Self {
            session_id: id,
            created_at,
            participant_id: session.participant_id().map(str::to_string),
            condition: session.condition().cloned(),
            condition_label: session
                .condition()
                .and_then(|c| catalog.get(c))
                .map(|c| c.label.clone()),
            phase: session.phase(),
            phase_started_at: session.phase_started_at(),
            chat_turns: session.transcript().len(),
            word_count: session.story_word_count(),
            thread_id: session.thread().map(|t| t.as_str().to_string()),
            busy: false,
        }
    }
}
