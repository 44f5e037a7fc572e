//! Error types for the session core.
//!
//! The session itself never returns errors: protocol failures surface as
//! [`crate::SessionNotice`]s. Errors here only guard construction.

use thiserror::Error;

/// Invalid session configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Room identifier is empty or whitespace
    #[error("room id must not be empty")]
    EmptyRoomId,

    /// History capacity of zero
    #[error("history capacity must be at least 1")]
    ZeroHistoryCapacity,
}
