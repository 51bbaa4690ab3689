//! Client configuration from environment variables

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_API_BASE: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

/// Everything the terminal client needs to start one tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base: String,
    pub state_path: PathBuf,
    pub tab_id: String,
    /// True when no tab id was supplied and a fresh one was generated
    pub tab_id_generated: bool,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base = match lookup("NCO_API_BASE") {
            Some(base) if base.trim().is_empty() => {
                return Err(ConfigError::Empty {
                    var: "NCO_API_BASE",
                })
            }
            Some(base) => base.trim().trim_end_matches('/').to_string(),
            None => DEFAULT_API_BASE.to_string(),
        };

        let state_path = lookup("NCO_STATE_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.nco-chat/state.db"))
            },
            PathBuf::from,
        );

        let (tab_id, tab_id_generated) = match lookup("NCO_TAB_ID") {
            Some(id) if !id.trim().is_empty() => (id.trim().to_string(), false),
            _ => (uuid::Uuid::new_v4().to_string(), true),
        };

        let request_timeout = match lookup("NCO_REQUEST_TIMEOUT_SECS") {
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        var: "NCO_REQUEST_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            },
        };

        Ok(Self {
            api_base,
            state_path,
            tab_id,
            tab_id_generated,
            request_timeout,
        })
    }
}
