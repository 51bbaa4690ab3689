//! nco-chat - client for a conversational job-role matching service
//!
//! A per-tab chat session: a pure state machine over a typed backend
//! transport, with every mutation mirrored into a snapshot store so a
//! reload resumes the same conversation.

pub mod classifier;
pub mod config;
pub mod session;
pub mod state_machine;
pub mod store;
pub mod transport;

pub use classifier::{classify, Action, Classification};
pub use config::{ClientConfig, ConfigError};
pub use session::{ChatSession, Outcome, SessionError};
pub use state_machine::{Affordances, Message, Mode, Role, SessionEvent};
pub use store::{MemoryStore, Snapshot, SnapshotStore, SqliteStore, StoreError};
pub use transport::{HttpTransport, LoggingTransport, Transport, TransportError};
