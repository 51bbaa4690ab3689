//! Session driver
//!
//! Owns one tab's [`ChatState`], feeds events through the pure transition
//! function and performs the resulting effects: write-through persistence,
//! backend calls and the presentation feed.

#[cfg(test)]
pub mod testing;

use crate::classifier::Action;
use crate::state_machine::{
    transition, Affordances, ChatState, Effect, Event, Message, Mode, RejectReason, SessionEvent,
    TransitionError,
};
use crate::store::{SnapshotStore, StoreResult};
use crate::transport::Transport;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::broadcast;

const FEED_CAPACITY: usize = 128;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// How a user action ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Applied, and any backend call succeeded
    Completed,
    /// The backend call failed; the classified action has been applied
    Failed { action: Action },
    /// Not applicable right now; nothing changed
    Ignored(RejectReason),
}

/// Result of applying one event under the state lock
struct Applied {
    backend_call: Option<Effect>,
    raised: Option<Action>,
}

/// One tab's chat session.
///
/// State is only touched inside a single synchronous lock acquisition per
/// event, so the processing flag check-and-set never interleaves with a
/// network call. The lock is never held across an await.
pub struct ChatSession<T, S> {
    transport: T,
    store: S,
    state: Mutex<ChatState>,
    feed: broadcast::Sender<SessionEvent>,
}

impl<T, S> ChatSession<T, S>
where
    T: Transport,
    S: SnapshotStore,
{
    pub fn new(transport: T, store: S) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            transport,
            store,
            state: Mutex::new(ChatState::default()),
            feed,
        }
    }

    /// Subscribe to the presentation feed
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.feed.subscribe()
    }

    /// Copy of the full state
    pub fn state(&self) -> ChatState {
        self.lock_state().clone()
    }

    pub fn mode(&self) -> Mode {
        self.lock_state().mode
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock_state().messages.clone()
    }

    pub fn is_processing(&self) -> bool {
        self.lock_state().processing
    }

    pub fn affordances(&self) -> Affordances {
        self.lock_state().affordances()
    }

    /// Restore the persisted session, or create one on the backend
    pub async fn initialize(&self) -> Result<Outcome, SessionError> {
        let restored = match self.store.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read session snapshot, starting fresh");
                None
            }
        };
        if let Some(snapshot) = restored.as_ref().filter(|s| !s.is_restorable()) {
            tracing::warn!(mode = %snapshot.mode, "Ignoring unusable session snapshot");
        }
        self.dispatch(Event::Boot { restored }).await
    }

    /// Send one user message and wait for the exchange to finish
    pub async fn submit(&self, text: &str) -> Result<Outcome, SessionError> {
        self.dispatch(Event::user_submit(text)).await
    }

    /// Replace the current thread with a fresh one under the same session
    pub async fn start_new_chat(&self) -> Result<Outcome, SessionError> {
        self.dispatch(Event::NewChatRequested).await
    }

    /// The tab is closing: drop the persisted snapshot
    pub fn close_tab(&self) -> StoreResult<()> {
        tracing::info!("Discarding session snapshot");
        self.store.discard()
    }

    async fn dispatch(&self, event: Event) -> Result<Outcome, SessionError> {
        let mut next = Some(event);
        let mut outcome = Outcome::Completed;

        while let Some(event) = next.take() {
            let applied = match self.apply(event) {
                Ok(applied) => applied,
                Err(TransitionError::Rejected(reason)) => {
                    tracing::debug!(%reason, "Ignoring user action");
                    return Ok(Outcome::Ignored(reason));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Invalid session transition");
                    return Err(e.into());
                }
            };

            if let Some(action) = applied.raised {
                if action.is_terminal() {
                    tracing::warn!(?action, "Backend failure disabled input");
                }
                outcome = Outcome::Failed { action };
            }
            if let Some(effect) = applied.backend_call {
                next = self.execute_backend_call(effect).await;
            }
        }

        Ok(outcome)
    }

    /// Transition and run every synchronous effect under one lock acquisition
    fn apply(&self, event: Event) -> Result<Applied, TransitionError> {
        let mut state = self.lock_state();
        let name = event.name();
        let result = transition(&state, event)?;
        *state = result.new_state;

        tracing::debug!(
            event = name,
            mode = %state.mode,
            processing = state.processing,
            messages = state.messages.len(),
            "Applied transition"
        );

        let mut applied = Applied {
            backend_call: None,
            raised: None,
        };
        for effect in result.effects {
            match effect {
                Effect::PersistSnapshot => self.persist(&state),
                Effect::Notify(notice) => {
                    if let SessionEvent::ErrorRaised { action, .. } = &notice {
                        applied.raised = Some(*action);
                    }
                    // No subscribers is fine.
                    let _ = self.feed.send(notice);
                }
                call => applied.backend_call = Some(call),
            }
        }
        Ok(applied)
    }

    async fn execute_backend_call(&self, effect: Effect) -> Option<Event> {
        let event = match effect {
            Effect::CreateSession => match self.transport.create_session().await {
                Ok(ids) => {
                    tracing::info!(session_id = %ids.session_id, thread_id = %ids.thread_id, "Session created");
                    Event::SessionCreated { ids }
                }
                Err(error) => Event::RequestFailed { error },
            },
            Effect::CreateThread { session_id } => {
                match self.transport.create_thread(&session_id).await {
                    Ok(thread) => {
                        tracing::info!(thread_id = %thread.thread_id, "Thread created");
                        Event::ThreadCreated { thread }
                    }
                    Err(error) => Event::RequestFailed { error },
                }
            }
            Effect::Advance { request } => match self.transport.advance(&request).await {
                Ok(exchange) => Event::ExchangeCompleted { exchange },
                Err(error) => Event::RequestFailed { error },
            },
            Effect::PersistSnapshot | Effect::Notify(_) => return None,
        };
        Some(event)
    }

    fn persist(&self, state: &ChatState) {
        let Some(snapshot) = state.snapshot() else {
            return;
        };
        if let Err(e) = self.store.save(&snapshot) {
            tracing::error!(error = %e, "Failed to persist session snapshot");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
