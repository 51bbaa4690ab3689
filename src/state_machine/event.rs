//! Events that drive the session state machine

use crate::store::Snapshot;
use crate::transport::{Exchange, NewThread, SessionIds, TransportError};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Lifecycle
    /// Tab opened; carries the persisted snapshot when one could be read
    Boot { restored: Option<Snapshot> },

    // User events
    UserSubmit { text: String },
    NewChatRequested,

    // Backend events
    SessionCreated { ids: SessionIds },
    ThreadCreated { thread: NewThread },
    ExchangeCompleted { exchange: Exchange },
    RequestFailed { error: TransportError },
}

impl Event {
    pub fn user_submit(text: impl Into<String>) -> Self {
        Event::UserSubmit { text: text.into() }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::Boot { .. } => "boot",
            Event::UserSubmit { .. } => "user_submit",
            Event::NewChatRequested => "new_chat_requested",
            Event::SessionCreated { .. } => "session_created",
            Event::ThreadCreated { .. } => "thread_created",
            Event::ExchangeCompleted { .. } => "exchange_completed",
            Event::RequestFailed { .. } => "request_failed",
        }
    }
}
