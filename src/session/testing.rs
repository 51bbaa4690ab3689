//! Mock transports for testing
//!
//! These mocks let the session driver run without a backend.

use crate::transport::{
    AdvanceRequest, Exchange, ExchangeStatus, NewThread, SessionIds, Transport, TransportError,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// A backend call the mock received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateSession,
    CreateThread(String),
    Advance(AdvanceRequest),
}

/// Mock transport that returns queued responses
#[derive(Default)]
pub struct MockTransport {
    sessions: Mutex<VecDeque<Result<SessionIds, TransportError>>>,
    threads: Mutex<VecDeque<Result<NewThread, TransportError>>>,
    exchanges: Mutex<VecDeque<Result<Exchange, TransportError>>>,
    /// Record of all calls made
    pub calls: Mutex<Vec<Call>>,
    delay: Option<Duration>,
    /// Notified when a call starts (for test synchronization). Holds a permit,
    /// so a waiter that registers after the call still wakes.
    pub request_started: Arc<Notify>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps before answering
    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn queue_session(&self, session_id: &str, thread_id: &str) {
        self.sessions.lock().unwrap().push_back(Ok(SessionIds {
            session_id: session_id.to_string(),
            thread_id: thread_id.to_string(),
        }));
    }

    pub fn queue_session_error(&self, error: TransportError) {
        self.sessions.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_thread(&self, thread_id: &str) {
        self.threads.lock().unwrap().push_back(Ok(NewThread {
            thread_id: thread_id.to_string(),
        }));
    }

    pub fn queue_thread_error(&self, error: TransportError) {
        self.threads.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_exchange(&self, result: &str, status: &str) {
        self.exchanges.lock().unwrap().push_back(Ok(Exchange {
            result_text: result.to_string(),
            status: ExchangeStatus::from(status.to_string()),
        }));
    }

    pub fn queue_exchange_error(&self, error: TransportError) {
        self.exchanges.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded calls
    pub fn recorded_calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn begin(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
        self.request_started.notify_one();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn next<T>(queue: &Mutex<VecDeque<Result<T, TransportError>>>) -> Result<T, TransportError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(TransportError::network()))
}

#[async_trait]
impl Transport for MockTransport {
    async fn create_session(&self) -> Result<SessionIds, TransportError> {
        self.begin(Call::CreateSession).await;
        next(&self.sessions)
    }

    async fn create_thread(&self, session_id: &str) -> Result<NewThread, TransportError> {
        self.begin(Call::CreateThread(session_id.to_string())).await;
        next(&self.threads)
    }

    async fn advance(&self, request: &AdvanceRequest) -> Result<Exchange, TransportError> {
        self.begin(Call::Advance(request.clone())).await;
        next(&self.exchanges)
    }
}
