//! Error types for frame decoding and payload conversion.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding or building frames.
///
/// Unrecognized frame prefixes are not errors: [`crate::Frame::decode`]
/// returns `Ok(None)` for them. These variants cover frames whose prefix was
/// recognized but whose payload could not be interpreted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload after a recognized prefix is not valid JSON
    #[error("invalid JSON after prefix {prefix:?}: {reason}")]
    InvalidJson {
        /// Frame prefix that was recognized
        prefix: String,
        /// Parser error message
        reason: String,
    },

    /// Frame kind requires a payload but none followed the prefix
    #[error("missing payload after prefix {prefix:?}")]
    MissingPayload {
        /// Frame prefix that was recognized
        prefix: String,
    },

    /// Event frame payload is not a JSON array
    #[error("event payload is not an array")]
    EventNotArray,

    /// Event array is empty or its first element is not a string
    #[error("event array has no name")]
    MissingEventName,

    /// Event arguments do not match the shape expected for the event
    #[error("invalid {event} payload: {reason}")]
    InvalidEventPayload {
        /// Event name
        event: String,
        /// Deserialization error message
        reason: String,
    },

    /// Correlation identifier outside 0-9
    #[error("ack id {0} out of range 0-9")]
    AckIdOutOfRange(u8),

    /// Request body could not be serialized
    #[error("failed to serialize {what}: {reason}")]
    Serialize {
        /// What was being serialized
        what: &'static str,
        /// Serializer error message
        reason: String,
    },
}
