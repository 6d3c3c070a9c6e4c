//! Events that drive phase transitions

use crate::auth::AdminGrant;
use crate::state_machine::state::Phase;

/// Participant and researcher triggers
#[derive(Debug, Clone)]
pub enum Event {
    // Participant events
    Login { participant_id: String },
    Ready,
    FinishBrainstorming,
    SaveDraft { text: String },
    SubmitStory { story: String },

    // Researcher events
    Override { to: Phase, grant: AdminGrant },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Login { .. } => "login",
            Event::Ready => "ready",
            Event::FinishBrainstorming => "finish_brainstorming",
            Event::SaveDraft { .. } => "save_draft",
            Event::SubmitStory { .. } => "submit_story",
            Event::Override { .. } => "override",
        }
    }
}
