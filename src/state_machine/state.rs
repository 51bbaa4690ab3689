//! Session and thread state types

use crate::store::Snapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Transcript
// ============================================================================

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    #[serde(alias = "bot")]
    Assistant,
    System,
}

/// One turn of the transcript. Content is opaque text and is never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

// ============================================================================
// Thread Mode
// ============================================================================

/// Lifecycle of the current thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// No session yet, or before a persisted one is restored
    #[default]
    #[serde(alias = "init")]
    Uninitialized,
    /// Fresh thread; the next message goes to `/start`
    #[serde(alias = "start")]
    Active,
    /// Backend asked a follow-up; the next message goes to `/resume`
    #[serde(alias = "resume")]
    AwaitingMoreInfo,
    /// Thread finished; only a new chat continues
    Closed,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Uninitialized => "uninitialized",
            Mode::Active => "active",
            Mode::AwaitingMoreInfo => "awaiting-more-info",
            Mode::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Input lockout applied by a terminal error. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lockout {
    #[default]
    None,
    /// Current thread is unusable; a new chat lifts this
    Thread,
    /// Session is unusable for the rest of this tab
    Session,
}

// ============================================================================
// Chat State
// ============================================================================

/// Everything the session state machine owns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatState {
    pub session_id: Option<String>,
    pub thread_id: Option<String>,
    pub mode: Mode,
    pub messages: Vec<Message>,
    /// At most one backend call in flight
    pub processing: bool,
    pub lockout: Lockout,
    /// Last failure looked like lost connectivity
    pub offline: bool,
}

impl ChatState {
    /// Rebuild state from a persisted snapshot. Transient flags start clear.
    pub fn restore(snapshot: Snapshot) -> Self {
        Self {
            session_id: snapshot.session_id,
            thread_id: snapshot.thread_id,
            mode: snapshot.mode,
            messages: snapshot.messages,
            ..Self::default()
        }
    }

    /// The persisted mirror, when there is a session to persist
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.session_id.as_ref()?;
        Some(Snapshot {
            session_id: self.session_id.clone(),
            thread_id: self.thread_id.clone(),
            mode: self.mode,
            messages: self.messages.clone(),
        })
    }

    pub fn has_session(&self) -> bool {
        self.session_id.is_some()
    }

    /// UI affordances, derived purely from state
    pub fn affordances(&self) -> Affordances {
        let usable_mode = matches!(self.mode, Mode::Active | Mode::AwaitingMoreInfo);
        Affordances {
            input_enabled: self.has_session()
                && usable_mode
                && self.lockout == Lockout::None
                && !self.processing,
            show_new_chat: self.has_session()
                && self.lockout != Lockout::Session
                && (matches!(self.mode, Mode::AwaitingMoreInfo | Mode::Closed)
                    || self.lockout == Lockout::Thread),
            offline_indicator: self.offline,
            session_expired: self.lockout == Lockout::Session,
        }
    }
}

/// What the presentation layer should enable or show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Affordances {
    pub input_enabled: bool,
    pub show_new_chat: bool,
    pub offline_indicator: bool,
    pub session_expired: bool,
}
