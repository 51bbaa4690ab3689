//! Backend transport
//!
//! Issues typed requests to the matching service and normalizes every
//! failure into a [`TransportError`].

mod error;
mod http;
mod types;

pub use error::{TransportError, NETWORK_ERROR_MESSAGE, REQUEST_FAILED_MESSAGE};
pub use http::{HttpTransport, SESSION_HEADER};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Remote operations of the matching backend
#[async_trait]
pub trait Transport: Send + Sync {
    /// `POST /create-new-session`
    async fn create_session(&self) -> Result<SessionIds, TransportError>;

    /// `POST /create-new-chat`
    async fn create_thread(&self, session_id: &str) -> Result<NewThread, TransportError>;

    /// `PUT /start` or `PUT /resume`
    async fn advance(&self, request: &AdvanceRequest) -> Result<Exchange, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn create_session(&self) -> Result<SessionIds, TransportError> {
        (**self).create_session().await
    }

    async fn create_thread(&self, session_id: &str) -> Result<NewThread, TransportError> {
        (**self).create_thread(session_id).await
    }

    async fn advance(&self, request: &AdvanceRequest) -> Result<Exchange, TransportError> {
        (**self).advance(request).await
    }
}

/// Logging wrapper for transports
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T: Transport> LoggingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    fn log_outcome<R>(operation: &str, started: Instant, result: &Result<R, TransportError>) {
        let duration = started.elapsed();
        match result {
            Ok(_) => {
                tracing::info!(
                    operation,
                    duration_ms = %duration.as_millis(),
                    "Backend request completed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    operation,
                    duration_ms = %duration.as_millis(),
                    category = e.category().unwrap_or("none"),
                    status = ?e.status,
                    error = %e.message,
                    "Backend request failed"
                );
            }
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for LoggingTransport<T> {
    async fn create_session(&self) -> Result<SessionIds, TransportError> {
        let start = Instant::now();
        let result = self.inner.create_session().await;
        Self::log_outcome("create_session", start, &result);
        result
    }

    async fn create_thread(&self, session_id: &str) -> Result<NewThread, TransportError> {
        let start = Instant::now();
        let result = self.inner.create_thread(session_id).await;
        Self::log_outcome("create_thread", start, &result);
        result
    }

    async fn advance(&self, request: &AdvanceRequest) -> Result<Exchange, TransportError> {
        let start = Instant::now();
        let result = self.inner.advance(request).await;
        if let Ok(exchange) = &result {
            tracing::debug!(
                thread_id = %request.thread_id,
                variant = %request.variant,
                status = exchange.status.as_str(),
                "Exchange status"
            );
        }
        Self::log_outcome("advance", start, &result);
        result
    }
}
