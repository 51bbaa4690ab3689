//! Error classification
//!
//! Maps a normalized [`TransportError`] to user-facing text and the
//! recovery action the session must apply. This table is the only place
//! that looks at backend categories.

use crate::state_machine::Mode;
use crate::transport::{TransportError, REQUEST_FAILED_MESSAGE};
use serde::{Deserialize, Serialize};

/// Fixed text for failures that make the whole session unusable
pub const SESSION_EXPIRED_MESSAGE: &str =
    "Session expired. Close this tab and start in a new tab.";

const CLOSED_THREAD_FALLBACK: &str = "This chat is closed.";
const UNEXPECTED_FALLBACK: &str = "Unexpected error";

/// Backend error categories this client knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    InvalidSessionId,
    MissingHeader,
    InvalidThreadId,
    ThreadIdNotFound,
    ThreadIdAlreadyExists,
    ClosedThread,
    DatabaseError,
}

impl ErrorCategory {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "INVALID_SESSION_ID" => Some(Self::InvalidSessionId),
            "MISSING_HEADER" => Some(Self::MissingHeader),
            "INVALID_THREAD_ID" => Some(Self::InvalidThreadId),
            "THREAD_ID_NOT_FOUND" => Some(Self::ThreadIdNotFound),
            "THREAD_ID_ALREADY_EXISTS" => Some(Self::ThreadIdAlreadyExists),
            "CLOSED_THREAD" => Some(Self::ClosedThread),
            "DATABASE_ERROR" => Some(Self::DatabaseError),
            _ => None,
        }
    }
}

/// What the session must do about a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Unusable without a brand-new session; input disabled for good
    SessionTerminal,
    /// Current thread unusable; offer a new chat
    ThreadTerminal,
    /// Transient backend failure; the user may resend
    RetryableSilent,
    /// Probably connectivity; show the reconnecting indicator
    RetryableWithOfflineIndicator,
}

impl Action {
    pub fn is_terminal(self) -> bool {
        matches!(self, Action::SessionTerminal | Action::ThreadTerminal)
    }
}

/// Classifier verdict for one failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub user_message: String,
    pub action: Action,
    /// Mode the thread must be forced into, if any
    pub forced_mode: Option<Mode>,
}

pub fn classify(error: &TransportError) -> Classification {
    let category = error.category().and_then(ErrorCategory::parse);
    let backend_message = |fallback: &str| {
        let message = error.message.trim();
        if message.is_empty() {
            fallback.to_string()
        } else {
            error.message.clone()
        }
    };

    match category {
        Some(ErrorCategory::InvalidSessionId | ErrorCategory::MissingHeader) => Classification {
            user_message: SESSION_EXPIRED_MESSAGE.to_string(),
            action: Action::SessionTerminal,
            forced_mode: None,
        },
        Some(
            ErrorCategory::InvalidThreadId
            | ErrorCategory::ThreadIdNotFound
            | ErrorCategory::ThreadIdAlreadyExists,
        ) => Classification {
            user_message: backend_message(UNEXPECTED_FALLBACK),
            action: Action::ThreadTerminal,
            forced_mode: None,
        },
        Some(ErrorCategory::ClosedThread) => Classification {
            user_message: backend_message(CLOSED_THREAD_FALLBACK),
            action: Action::ThreadTerminal,
            forced_mode: Some(Mode::Closed),
        },
        Some(ErrorCategory::DatabaseError) => Classification {
            user_message: backend_message(UNEXPECTED_FALLBACK),
            action: Action::RetryableSilent,
            forced_mode: None,
        },
        None => Classification {
            user_message: backend_message(if error.category.is_some() {
                UNEXPECTED_FALLBACK
            } else {
                REQUEST_FAILED_MESSAGE
            }),
            action: Action::RetryableWithOfflineIndicator,
            forced_mode: None,
        },
    }
}
