//! Pure state transition function
//!
//! Given the same state and event, always produces the same new state and
//! effects. All I/O happens in the session driver.

use super::state::{ChatState, Lockout, Message, Mode};
use super::{Effect, Event, SessionEvent};
use crate::classifier::{classify, Action};
use crate::store::Snapshot;
use crate::transport::{AdvanceRequest, EndpointVariant, Exchange, NewThread, SessionIds, TransportError};
use std::fmt;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Why a user action was ignored. Rejections are no-ops, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A backend call is already in flight
    Busy,
    EmptyMessage,
    ThreadClosed,
    /// A terminal error disabled input
    InputLocked,
    NoSession,
    AlreadyInitialized,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::Busy => "a request is already in progress",
            RejectReason::EmptyMessage => "message is empty",
            RejectReason::ThreadClosed => "this chat is closed",
            RejectReason::InputLocked => "input is disabled",
            RejectReason::NoSession => "no session yet",
            RejectReason::AlreadyInitialized => "session already initialized",
        };
        f.write_str(text)
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Ignored: {0}")]
    Rejected(RejectReason),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(state: &ChatState, event: Event) -> Result<TransitionResult, TransitionError> {
    match event {
        // ============================================================
        // Initialization
        // ============================================================
        Event::Boot { restored } => boot(state, restored),

        Event::SessionCreated { ids } => session_created(state, ids),

        // ============================================================
        // Message Exchange
        // ============================================================
        Event::UserSubmit { text } => user_submit(state, &text),

        Event::ExchangeCompleted { exchange } => exchange_completed(state, exchange),

        // ============================================================
        // New Chat
        // ============================================================
        Event::NewChatRequested => new_chat_requested(state),

        Event::ThreadCreated { thread } => thread_created(state, thread),

        // ============================================================
        // Error Recovery
        // ============================================================
        Event::RequestFailed { error } => request_failed(state, &error),
    }
}

fn boot(state: &ChatState, restored: Option<Snapshot>) -> Result<TransitionResult, TransitionError> {
    if state.has_session() {
        return rejected(RejectReason::AlreadyInitialized);
    }
    if state.processing {
        return rejected(RejectReason::Busy);
    }

    if let Some(snapshot) = restored.filter(Snapshot::is_restorable) {
        let new_state = ChatState::restore(snapshot);
        let notice = SessionEvent::SessionRestored {
            mode: new_state.mode,
            message_count: new_state.messages.len(),
        };
        return Ok(TransitionResult::new(new_state).with_effect(Effect::Notify(notice)));
    }

    let new_state = ChatState {
        processing: true,
        ..state.clone()
    };
    Ok(TransitionResult::new(new_state)
        .with_effect(Effect::processing_changed(true))
        .with_effect(Effect::CreateSession))
}

fn session_created(state: &ChatState, ids: SessionIds) -> Result<TransitionResult, TransitionError> {
    if !state.processing || state.has_session() {
        return Err(invalid(state, "session created without a pending request"));
    }

    let had_messages = !state.messages.is_empty();
    let new_state = ChatState {
        session_id: Some(ids.session_id.clone()),
        thread_id: Some(ids.thread_id.clone()),
        mode: Mode::Active,
        messages: vec![],
        processing: false,
        lockout: Lockout::None,
        offline: false,
    };

    let mut result = TransitionResult::new(new_state).with_effect(Effect::PersistSnapshot);
    if had_messages {
        result = result.with_effect(Effect::Notify(SessionEvent::TranscriptReset));
    }
    Ok(result.with_effects([
        Effect::Notify(SessionEvent::SessionStarted {
            session_id: ids.session_id,
            thread_id: ids.thread_id,
        }),
        Effect::mode_changed(Mode::Active),
        Effect::processing_changed(false),
    ]))
}

fn user_submit(state: &ChatState, text: &str) -> Result<TransitionResult, TransitionError> {
    if state.lockout == Lockout::Session {
        return rejected(RejectReason::InputLocked);
    }
    let (Some(session_id), Some(thread_id)) = (&state.session_id, &state.thread_id) else {
        return rejected(RejectReason::NoSession);
    };
    if state.processing {
        return rejected(RejectReason::Busy);
    }
    let variant = match state.mode {
        Mode::Active => EndpointVariant::Start,
        Mode::AwaitingMoreInfo => EndpointVariant::Resume,
        Mode::Closed => return rejected(RejectReason::ThreadClosed),
        Mode::Uninitialized => return rejected(RejectReason::NoSession),
    };
    if state.lockout == Lockout::Thread {
        return rejected(RejectReason::InputLocked);
    }
    let text = text.trim();
    if text.is_empty() {
        return rejected(RejectReason::EmptyMessage);
    }

    let message = Message::user(text);
    let request = AdvanceRequest {
        session_id: session_id.clone(),
        thread_id: thread_id.clone(),
        message: text.to_string(),
        variant,
    };

    let mut new_state = state.clone();
    new_state.messages.push(message.clone());
    new_state.processing = true;

    // The utterance is durable before the request that carries it starts.
    Ok(TransitionResult::new(new_state).with_effects([
        Effect::message_appended(message),
        Effect::PersistSnapshot,
        Effect::processing_changed(true),
        Effect::Advance { request },
    ]))
}

fn exchange_completed(state: &ChatState, exchange: Exchange) -> Result<TransitionResult, TransitionError> {
    if !state.processing || !matches!(state.mode, Mode::Active | Mode::AwaitingMoreInfo) {
        return Err(invalid(state, "exchange completed without a pending message"));
    }

    let mode = if exchange.status.continues_thread() {
        Mode::AwaitingMoreInfo
    } else {
        Mode::Closed
    };
    let message = Message::assistant(exchange.result_text);

    let mut new_state = state.clone();
    new_state.messages.push(message.clone());
    new_state.mode = mode;
    new_state.processing = false;
    new_state.offline = false;

    let mut result = TransitionResult::new(new_state)
        .with_effect(Effect::message_appended(message))
        .with_effect(Effect::PersistSnapshot);
    if mode != state.mode {
        result = result.with_effect(Effect::mode_changed(mode));
    }
    Ok(result.with_effect(Effect::processing_changed(false)))
}

fn new_chat_requested(state: &ChatState) -> Result<TransitionResult, TransitionError> {
    if state.lockout == Lockout::Session {
        return rejected(RejectReason::InputLocked);
    }
    let Some(session_id) = &state.session_id else {
        return rejected(RejectReason::NoSession);
    };
    if state.processing {
        return rejected(RejectReason::Busy);
    }

    let session_id = session_id.clone();
    let new_state = ChatState {
        processing: true,
        ..state.clone()
    };
    Ok(TransitionResult::new(new_state)
        .with_effect(Effect::processing_changed(true))
        .with_effect(Effect::CreateThread { session_id }))
}

fn thread_created(state: &ChatState, thread: NewThread) -> Result<TransitionResult, TransitionError> {
    if !state.processing || !state.has_session() {
        return Err(invalid(state, "thread created without a pending request"));
    }

    let new_state = ChatState {
        thread_id: Some(thread.thread_id.clone()),
        mode: Mode::Active,
        messages: vec![],
        processing: false,
        lockout: Lockout::None,
        offline: false,
        ..state.clone()
    };

    let mut result = TransitionResult::new(new_state).with_effects([
        Effect::PersistSnapshot,
        Effect::Notify(SessionEvent::TranscriptReset),
        Effect::Notify(SessionEvent::ThreadStarted {
            thread_id: thread.thread_id,
        }),
    ]);
    if state.mode != Mode::Active {
        result = result.with_effect(Effect::mode_changed(Mode::Active));
    }
    Ok(result.with_effect(Effect::processing_changed(false)))
}

fn request_failed(state: &ChatState, error: &TransportError) -> Result<TransitionResult, TransitionError> {
    if !state.processing {
        return Err(invalid(state, "request failed with nothing in flight"));
    }

    let verdict = classify(error);
    let message = Message::system(verdict.user_message.clone());

    let mut new_state = state.clone();
    new_state.processing = false;
    new_state.messages.push(message.clone());
    match verdict.action {
        Action::SessionTerminal => new_state.lockout = Lockout::Session,
        Action::ThreadTerminal => {
            if new_state.lockout != Lockout::Session {
                new_state.lockout = Lockout::Thread;
            }
        }
        Action::RetryableSilent => {}
        Action::RetryableWithOfflineIndicator => new_state.offline = true,
    }
    // A forced mode only applies to an existing thread.
    if let Some(mode) = verdict.forced_mode.filter(|_| state.thread_id.is_some()) {
        new_state.mode = mode;
    }

    let mut result = TransitionResult::new(new_state.clone())
        .with_effect(Effect::message_appended(message))
        .with_effect(Effect::PersistSnapshot);
    if new_state.mode != state.mode {
        result = result.with_effect(Effect::mode_changed(new_state.mode));
    }
    Ok(result.with_effects([
        Effect::Notify(SessionEvent::ErrorRaised {
            message: verdict.user_message,
            action: verdict.action,
        }),
        Effect::processing_changed(false),
    ]))
}

fn rejected(reason: RejectReason) -> Result<TransitionResult, TransitionError> {
    Err(TransitionError::Rejected(reason))
}

fn invalid(state: &ChatState, what: &str) -> TransitionError {
    TransitionError::InvalidTransition(format!(
        "{what} (mode {}, processing {})",
        state.mode, state.processing
    ))
}
