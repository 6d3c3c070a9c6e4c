//! Experiment phase state machine
//!
//! Implements the Elm Architecture pattern: a pure transition function maps
//! (phase, event) to the next phase plus effects the runtime applies.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{ChatTurn, Phase, Role, Session, Transcript};
pub use transition::{transition, TransitionError, TransitionResult};
