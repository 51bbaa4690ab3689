//! Session state machine
//!
//! Elm-style core: a pure [`transition`] from state and event to new state
//! and effects. The session driver performs the effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, SessionEvent};
pub use event::Event;
pub use state::{Affordances, ChatState, Lockout, Message, Mode, Role};
pub use transition::{transition, RejectReason, TransitionError, TransitionResult};
