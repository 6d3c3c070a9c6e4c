//! Session state types

use crate::auth::AdminGrant;
use crate::conditions::{assign, ConditionCatalog, ConditionId, RandomSource};
use crate::llm::{MessageRole, ThreadHandle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Phase
// ============================================================================

/// Ordered stage of the experiment flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Login,
    Instruction,
    Brainstorming,
    Writing,
    /// Terminal
    Submission,
}

/// Countdown shown to the participant; purely informational
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdvisoryTimer {
    pub minutes: u32,
    pub label: &'static str,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Login,
        Phase::Instruction,
        Phase::Brainstorming,
        Phase::Writing,
        Phase::Submission,
    ];

    /// Chat with the AI partner is open only while brainstorming
    pub fn accepts_chat(self) -> bool {
        self == Phase::Brainstorming
    }

    pub fn advisory_timer(self) -> Option<AdvisoryTimer> {
        match self {
            Phase::Instruction => Some(AdvisoryTimer {
                minutes: 5,
                label: "Reading Time",
            }),
            Phase::Brainstorming => Some(AdvisoryTimer {
                minutes: 15,
                label: "Brainstorming",
            }),
            Phase::Writing => Some(AdvisoryTimer {
                minutes: 25,
                label: "Writing Time",
            }),
            Phase::Login | Phase::Submission => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Login => "login",
            Phase::Instruction => "instruction",
            Phase::Brainstorming => "brainstorming",
            Phase::Writing => "writing",
            Phase::Submission => "submission",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Transcript
// ============================================================================

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only chat record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatTurn> {
        self.turns.iter()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a ChatTurn;
    type IntoIter = std::slice::Iter<'a, ChatTurn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Per-participant experiment state
#[derive(Debug, Clone)]
pub struct Session {
    participant_id: Option<String>,
    condition: Option<ConditionId>,
    phase: Phase,
    transcript: Transcript,
    story_text: String,
    thread: Option<ThreadHandle>,
    phase_started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            participant_id: None,
            condition: None,
            phase: Phase::Login,
            transcript: Transcript::default(),
            story_text: String::new(),
            thread: None,
            phase_started_at: now,
        }
    }

    pub fn participant_id(&self) -> Option<&str> {
        self.participant_id.as_deref()
    }

    pub fn condition(&self) -> Option<&ConditionId> {
        self.condition.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn story_text(&self) -> &str {
        &self.story_text
    }

    pub fn story_word_count(&self) -> usize {
        self.story_text.split_whitespace().count()
    }

    pub fn thread(&self) -> Option<&ThreadHandle> {
        self.thread.as_ref()
    }

    pub fn phase_started_at(&self) -> DateTime<Utc> {
        self.phase_started_at
    }

    pub(crate) fn set_participant(&mut self, participant_id: String) {
        self.participant_id = Some(participant_id);
    }

    /// Assign a condition unless one is already held; returns the held id
    pub(crate) fn ensure_condition(
        &mut self,
        catalog: &ConditionCatalog,
        rng: &dyn RandomSource,
    ) -> &ConditionId {
        self.condition
            .get_or_insert_with(|| assign(catalog, rng).id.clone())
    }

    /// Replace the assigned condition (researcher override)
    pub fn override_condition(&mut self, condition: ConditionId, _grant: AdminGrant) {
        self.condition = Some(condition);
    }

    /// Move to `phase`; the advisory clock restarts only on an actual change
    pub(crate) fn enter_phase(&mut self, phase: Phase, now: DateTime<Utc>) {
        if self.phase != phase {
            self.phase = phase;
            self.phase_started_at = now;
        }
    }

    pub(crate) fn set_story(&mut self, text: String) {
        self.story_text = text;
    }

    pub(crate) fn record_turn(&mut self, turn: ChatTurn) {
        self.transcript.push(turn);
    }

    /// Transcript and thread slot, borrowed together for a relay call
    pub(crate) fn relay_parts(&mut self) -> (&Transcript, &mut Option<ThreadHandle>) {
        (&self.transcript, &mut self.thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_grant;
    use crate::conditions::SequenceSource;

    #[test]
    fn phases_are_ordered() {
        let mut sorted = Phase::ALL;
        sorted.sort();
        assert_eq!(sorted, Phase::ALL);
        assert!(Phase::Login < Phase::Submission);
    }

    #[test]
    fn only_working_phases_have_timers() {
        assert_eq!(Phase::Instruction.advisory_timer().unwrap().minutes, 5);
        assert_eq!(Phase::Brainstorming.advisory_timer().unwrap().minutes, 15);
        assert_eq!(Phase::Writing.advisory_timer().unwrap().minutes, 25);
        assert!(Phase::Login.advisory_timer().is_none());
        assert!(Phase::Submission.advisory_timer().is_none());
    }

    #[test]
    fn condition_is_assigned_once() {
        let catalog = ConditionCatalog::standard();
        let rng = SequenceSource::new(vec![1, 3]);
        let mut session = Session::new(Utc::now());

        let first = session.ensure_condition(&catalog, &rng).clone();
        let second = session.ensure_condition(&catalog, &rng).clone();

        assert_eq!(first, ConditionId::new("G2"));
        assert_eq!(second, first);
    }

    #[test]
    fn override_replaces_condition() {
        let catalog = ConditionCatalog::standard();
        let mut session = Session::new(Utc::now());
        session.ensure_condition(&catalog, &SequenceSource::new(vec![0]));

        session.override_condition(ConditionId::new("G4"), test_grant());
        assert_eq!(session.condition(), Some(&ConditionId::new("G4")));
    }

    #[test]
    fn reentering_a_phase_keeps_its_clock() {
        let start = Utc::now();
        let mut session = Session::new(start);
        let later = start + chrono::Duration::minutes(3);

        session.enter_phase(Phase::Login, later);
        assert_eq!(session.phase_started_at(), start);

        session.enter_phase(Phase::Instruction, later);
        assert_eq!(session.phase_started_at(), later);
    }

    #[test]
    fn word_count_splits_on_whitespace() {
        let mut session = Session::new(Utc::now());
        session.set_story("  The  ship\nwoke up.\t".to_string());
        assert_eq!(session.story_word_count(), 4);
    }

    #[test]
    fn transcript_serializes_as_a_list() {
        let mut transcript = Transcript::default();
        transcript.push(ChatTurn::user("hi"));
        transcript.push(ChatTurn::assistant("hello"));
        assert_eq!(
            serde_json::to_value(&transcript).unwrap(),
            serde_json::json!([
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "hello" }
            ])
        );
    }
}
