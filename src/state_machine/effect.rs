//! Effects produced by state transitions

use super::state::{Message, Mode};
use crate::classifier::Action;
use crate::transport::AdvanceRequest;
use serde::Serialize;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write the new state through to the snapshot store
    PersistSnapshot,

    /// `POST /create-new-session`
    CreateSession,

    /// `POST /create-new-chat`
    CreateThread { session_id: String },

    /// `PUT /start` or `PUT /resume`
    Advance { request: AdvanceRequest },

    /// Publish to the presentation feed
    Notify(SessionEvent),
}

impl Effect {
    /// Whether this effect suspends on the network
    pub fn is_backend_call(&self) -> bool {
        matches!(
            self,
            Effect::CreateSession | Effect::CreateThread { .. } | Effect::Advance { .. }
        )
    }

    pub fn message_appended(message: Message) -> Self {
        Effect::Notify(SessionEvent::MessageAppended { message })
    }

    pub fn mode_changed(mode: Mode) -> Self {
        Effect::Notify(SessionEvent::ModeChanged { mode })
    }

    pub fn processing_changed(processing: bool) -> Self {
        Effect::Notify(SessionEvent::ProcessingChanged { processing })
    }
}

/// Append-only feed consumed by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        session_id: String,
        thread_id: String,
    },
    SessionRestored {
        mode: Mode,
        message_count: usize,
    },
    ThreadStarted {
        thread_id: String,
    },
    MessageAppended {
        message: Message,
    },
    /// The transcript was emptied for a new thread
    TranscriptReset,
    ModeChanged {
        mode: Mode,
    },
    ProcessingChanged {
        processing: bool,
    },
    ErrorRaised {
        message: String,
        action: Action,
    },
}
