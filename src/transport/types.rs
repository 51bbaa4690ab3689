//! Typed payloads for the four backend operations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifiers returned by `POST /create-new-session`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIds {
    pub session_id: String,
    pub thread_id: String,
}

/// Response of `POST /create-new-chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewThread {
    pub thread_id: String,
}

/// Which advance endpoint to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointVariant {
    /// First message of a fresh thread
    Start,
    /// Answer to a `MORE_INFO` question
    Resume,
}

impl EndpointVariant {
    pub fn path(self) -> &'static str {
        match self {
            EndpointVariant::Start => "/start",
            EndpointVariant::Resume => "/resume",
        }
    }
}

impl fmt::Display for EndpointVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointVariant::Start => f.write_str("start"),
            EndpointVariant::Resume => f.write_str("resume"),
        }
    }
}

/// Everything `advance` needs for one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceRequest {
    pub session_id: String,
    pub thread_id: String,
    pub message: String,
    pub variant: EndpointVariant,
}

/// Outcome the backend reports for one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeStatus {
    MoreInfo,
    MatchFound,
    /// Any status this client does not know; closes the thread like `MATCH_FOUND`
    Other(String),
}

impl ExchangeStatus {
    pub fn continues_thread(&self) -> bool {
        matches!(self, ExchangeStatus::MoreInfo)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExchangeStatus::MoreInfo => "MORE_INFO",
            ExchangeStatus::MatchFound => "MATCH_FOUND",
            ExchangeStatus::Other(s) => s,
        }
    }
}

impl From<String> for ExchangeStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "MORE_INFO" => ExchangeStatus::MoreInfo,
            "MATCH_FOUND" => ExchangeStatus::MatchFound,
            _ => ExchangeStatus::Other(value),
        }
    }
}

impl Serialize for ExchangeStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ExchangeStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ExchangeStatus::from)
    }
}

/// Response of `PUT /start` and `PUT /resume`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    #[serde(rename = "result")]
    pub result_text: String,
    pub status: ExchangeStatus,
}
