//! Effects produced by state transitions

/// Session mutations to apply after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Store the participant identity
    RecordParticipant { participant_id: String },

    /// Run the condition assigner (no-op if a condition is already held)
    AssignCondition,

    /// Replace the story draft
    SaveStory { text: String },
}
