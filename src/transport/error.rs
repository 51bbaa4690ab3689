//! Normalized transport failure

use thiserror::Error;

/// Generic text for failures that never produced a response
pub const NETWORK_ERROR_MESSAGE: &str = "Network error";

/// Generic text for non-2xx responses without a usable `error_message`
pub const REQUEST_FAILED_MESSAGE: &str = "Request failed";

/// Every non-success outcome of a backend call, in one shape.
///
/// `category` carries the backend's `detail` token (e.g. `CLOSED_THREAD`)
/// when one could be read. Network failures and unparseable bodies both
/// leave it empty and are handled identically downstream. `message` is blank
/// when the backend sent none.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub category: Option<String>,
    pub message: String,
    /// HTTP status when a response was received (diagnostics only)
    pub status: Option<u16>,
}

impl TransportError {
    pub fn new(category: Option<String>, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            status: None,
        }
    }

    pub fn categorized(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Some(category.into()), message)
    }

    pub fn uncategorized(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    /// Connection refused, DNS failure, timeout: no response at all
    pub fn network() -> Self {
        Self::uncategorized(NETWORK_ERROR_MESSAGE)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}
