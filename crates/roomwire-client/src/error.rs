//! Error types for the client runtime.

use std::time::Duration;

use thiserror::Error;

/// Transport-level failures.
///
/// These never reach facade callers directly; the runtime turns them into
/// session events that drive reconnection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Server URL could not be turned into a WebSocket endpoint.
    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    /// WebSocket handshake failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Connecting took longer than the configured timeout.
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    /// Outbound queue is full; the frame was not queued.
    #[error("outbound queue full ({0} frames)")]
    QueueFull(usize),

    /// Socket closed.
    #[error("socket closed: {0}")]
    Closed(String),
}

/// Errors returned by [`crate::ChatClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The runtime task has stopped; the client can no longer be used.
    #[error("client runtime has stopped")]
    Closed,

    /// The runtime is behind and the command was not queued.
    #[error("client command queue is full")]
    Busy,

    /// Invalid transport configuration.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
