//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::auth::test_grant;
use crate::conditions::{ConditionCatalog, SequenceSource};
use chrono::Utc;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_phase() -> impl Strategy<Value = Phase> {
    prop::sample::select(Phase::ALL.to_vec())
}

fn arb_participant_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[ a-zA-Z0-9]{0,8}".prop_map(|participant_id| Event::Login { participant_id }),
        Just(Event::Ready),
        Just(Event::FinishBrainstorming),
        "[a-z ]{0,30}".prop_map(|text| Event::SaveDraft { text }),
        "[a-z ]{0,30}".prop_map(|story| Event::SubmitStory { story }),
    ]
}

fn arb_any_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        4 => arb_participant_event(),
        1 => arb_phase().prop_map(|to| Event::Override { to, grant: test_grant() }),
    ]
}

/// Apply effects the way the runtime does, for invariant checks
fn apply(session: &mut Session, result: TransitionResult, catalog: &ConditionCatalog) {
    let rng = SequenceSource::new(vec![0, 1, 2, 3]);
    for effect in result.effects {
        match effect {
            Effect::RecordParticipant { participant_id } => session.set_participant(participant_id),
            Effect::AssignCondition => {
                session.ensure_condition(catalog, &rng);
            }
            Effect::SaveStory { text } => session.set_story(text),
        }
    }
    session.enter_phase(result.new_phase, Utc::now());
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Participant events never move the phase backwards, and a successful
    /// move advances by at most one step.
    #[test]
    fn participant_events_only_move_forward(
        phase in arb_phase(),
        event in arb_participant_event(),
    ) {
        if let Ok(result) = transition(phase, event) {
            prop_assert!(result.new_phase >= phase);
            let from = Phase::ALL.iter().position(|p| *p == phase).unwrap();
            let to = Phase::ALL.iter().position(|p| *p == result.new_phase).unwrap();
            prop_assert!(to - from <= 1);
        }
    }

    /// Override reaches any target from any phase
    #[test]
    fn override_reaches_any_phase(from in arb_phase(), to in arb_phase()) {
        let result = transition(from, Event::Override { to, grant: test_grant() }).unwrap();
        prop_assert_eq!(result.new_phase, to);
        prop_assert!(result.effects.is_empty());
    }

    /// The terminal phase accepts no participant event
    #[test]
    fn submission_is_terminal(event in arb_participant_event()) {
        prop_assert!(transition(Phase::Submission, event).is_err());
    }

    /// Transitions are deterministic
    #[test]
    fn transition_is_pure(phase in arb_phase(), event in arb_participant_event()) {
        let a = transition(phase, event.clone());
        let b = transition(phase, event);
        prop_assert_eq!(a, b);
    }

    /// Once assigned, the condition never changes through any event sequence
    /// without a condition override.
    #[test]
    fn condition_is_stable_once_assigned(
        events in proptest::collection::vec(arb_any_event(), 1..40),
    ) {
        let catalog = ConditionCatalog::standard();
        let mut session = Session::new(Utc::now());
        let mut first_condition = None;

        for event in events {
            if let Ok(result) = transition(session.phase(), event) {
                apply(&mut session, result, &catalog);
            }
            if let Some(first) = &first_condition {
                prop_assert_eq!(Some(first), session.condition());
            } else {
                first_condition = session.condition().cloned();
            }
        }
    }

    /// A condition is only ever held together with a participant identity,
    /// unless the researcher assigned one directly.
    #[test]
    fn condition_follows_identity(
        events in proptest::collection::vec(arb_any_event(), 1..40),
    ) {
        let catalog = ConditionCatalog::standard();
        let mut session = Session::new(Utc::now());

        for event in events {
            if let Ok(result) = transition(session.phase(), event) {
                apply(&mut session, result, &catalog);
            }
            if session.condition().is_some() {
                prop_assert!(session.participant_id().is_some());
            }
        }
    }
}
