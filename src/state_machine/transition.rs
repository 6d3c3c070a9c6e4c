//! Pure state transition function
//!
//! Given the same phase and event this always produces the same result,
//! with no I/O side effects. The runtime applies the returned effects.

use super::{Effect, Event, Phase};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug, PartialEq, Eq)]
pub struct TransitionResult {
    pub new_phase: Phase,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(phase: Phase) -> Self {
        Self {
            new_phase: phase,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Participant ID must not be empty")]
    EmptyParticipantId,
    #[error("Cannot {event} during the {phase} phase")]
    InvalidTransition { phase: Phase, event: &'static str },
}

/// Pure transition function
pub fn transition(phase: Phase, event: Event) -> Result<TransitionResult, TransitionError> {
    match (phase, event) {
        // Researcher override bypasses every precondition
        (_, Event::Override { to, .. }) => Ok(TransitionResult::new(to)),

        (Phase::Login, Event::Login { participant_id }) => {
            let participant_id = participant_id.trim();
            if participant_id.is_empty() {
                return Err(TransitionError::EmptyParticipantId);
            }
            Ok(TransitionResult::new(Phase::Instruction)
                .with_effect(Effect::RecordParticipant {
                    participant_id: participant_id.to_string(),
                })
                .with_effect(Effect::AssignCondition))
        }

        (Phase::Instruction, Event::Ready) => Ok(TransitionResult::new(Phase::Brainstorming)),

        (Phase::Brainstorming, Event::FinishBrainstorming) => {
            Ok(TransitionResult::new(Phase::Writing))
        }

        (Phase::Writing, Event::SaveDraft { text }) => {
            Ok(TransitionResult::new(Phase::Writing).with_effect(Effect::SaveStory { text }))
        }

        (Phase::Writing, Event::SubmitStory { story }) => Ok(TransitionResult::new(
            Phase::Submission,
        )
        .with_effect(Effect::SaveStory { text: story })),

        (phase, event) => Err(TransitionError::InvalidTransition {
            phase,
            event: event.name(),
        }),
    }
}
