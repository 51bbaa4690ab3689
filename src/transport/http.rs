//! reqwest-backed transport for the matching service

use super::error::{TransportError, REQUEST_FAILED_MESSAGE};
use super::types::{AdvanceRequest, Exchange, NewThread, SessionIds};
use super::Transport;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Header carrying session identity on every request once a session exists
pub const SESSION_HEADER: &str = "Session-Id";

/// HTTP transport against the backend contract
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R, TransportError> {
        let response = request.send().await.map_err(|e| {
            tracing::debug!(
                error = %e,
                timeout = e.is_timeout(),
                connect = e.is_connect(),
                "Request produced no response"
            );
            TransportError::network()
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|_| TransportError::network().with_status(status.as_u16()))?;

        if !status.is_success() {
            return Err(normalize_error_body(&body).with_status(status.as_u16()));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::debug!(error = %e, body = %body, "Malformed success body");
            TransportError::uncategorized("Malformed response from backend")
                .with_status(status.as_u16())
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn create_session(&self) -> Result<SessionIds, TransportError> {
        self.send(
            self.client
                .post(self.url("/create-new-session"))
                .header("content-type", "application/json"),
        )
        .await
    }

    async fn create_thread(&self, session_id: &str) -> Result<NewThread, TransportError> {
        require_session(session_id)?;
        self.send(
            self.client
                .post(self.url("/create-new-chat"))
                .header("content-type", "application/json")
                .header(SESSION_HEADER, session_id),
        )
        .await
    }

    async fn advance(&self, request: &AdvanceRequest) -> Result<Exchange, TransportError> {
        require_session(&request.session_id)?;
        if request.message.trim().is_empty() {
            return Err(TransportError::uncategorized("Message text is empty"));
        }

        let body = AdvanceBody {
            thread_id: &request.thread_id,
            user_message: &request.message,
        };
        self.send(
            self.client
                .put(self.url(request.variant.path()))
                .header(SESSION_HEADER, &request.session_id)
                .json(&body),
        )
        .await
    }
}

fn require_session(session_id: &str) -> Result<(), TransportError> {
    if session_id.trim().is_empty() {
        return Err(TransportError::categorized(
            "MISSING_HEADER",
            "Session-Id header missing",
        ));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct AdvanceBody<'a> {
    thread_id: &'a str,
    user_message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Turn a non-2xx body into a [`TransportError`].
///
/// Accepts the flat `{detail, error_message}` shape, the FastAPI envelope
/// `{"detail": {"detail": .., "error_message": ..}}`, and a plain-string
/// `detail`, which counts as a category only when it is an UPPER_SNAKE token.
/// A body that is not JSON at all gets the generic request-failed text.
pub(crate) fn normalize_error_body(body: &str) -> TransportError {
    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return TransportError::uncategorized(REQUEST_FAILED_MESSAGE);
    };

    let (category, nested_message) = match parsed.detail {
        Some(Value::Object(inner)) => (
            inner.get("detail").and_then(Value::as_str).map(String::from),
            inner
                .get("error_message")
                .and_then(Value::as_str)
                .map(String::from),
        ),
        Some(Value::String(detail)) if is_category_token(&detail) => (Some(detail), None),
        Some(Value::String(detail)) => (None, Some(detail)),
        _ => (None, None),
    };

    // Left blank when the body has none; the classifier picks the fallback.
    let message = parsed
        .error_message
        .or(nested_message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_default();

    TransportError::new(category, message)
}

fn is_category_token(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_uppercase())
        && s
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
