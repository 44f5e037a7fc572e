//! Session inputs, outputs and notices.
//!
//! [`SessionEvent`] is everything that can happen to a session,
//! [`SessionAction`] is everything a session asks its driver to do, and
//! [`SessionNotice`] is the typed lifecycle stream delivered to callers.

use std::time::Duration;

use roomwire_proto::{ChatMessage, Frame};
use serde_json::Value;

use crate::session::ConnectionState;

/// Input to [`crate::Session::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent<I> {
    /// Caller asked to connect.
    Connect,

    /// Caller asked to disconnect. Suppresses reconnection.
    Disconnect,

    /// Caller wants to post a chat message.
    SendMessage {
        /// Message body.
        text: String,
    },

    /// The transport requested by [`SessionAction::OpenTransport`] is up.
    TransportOpened,

    /// Opening the transport failed.
    TransportFailed {
        /// Failure description.
        reason: String,
    },

    /// An open transport closed.
    TransportClosed {
        /// Close description.
        reason: String,
    },

    /// One raw text frame from the socket.
    FrameReceived(String),

    /// Time advanced. Drives keepalive, ack expiry and reconnect delays.
    Tick {
        /// Current instant.
        now: I,
    },
}

/// Output of [`crate::Session::handle`], executed by the driver in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Open a new transport, replacing any existing one.
    OpenTransport,

    /// Close the current transport.
    CloseTransport,

    /// Write a frame to the transport.
    Send(Frame),

    /// Deliver a notice to subscribers.
    Notify(SessionNotice),
}

/// Lifecycle notice delivered to callers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    /// Transport opened; handshake is starting.
    Connected,

    /// Session dropped to [`ConnectionState::Disconnected`].
    Disconnected {
        /// Why the session ended.
        reason: String,
    },

    /// A reconnect attempt was scheduled.
    Reconnecting {
        /// Attempt number, starting at 1.
        attempt: u32,
        /// Delay before the attempt starts.
        delay: Duration,
    },

    /// Reconnect attempts are exhausted. Emitted once until the next
    /// explicit connect.
    GaveUp {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// A chat message arrived.
    MessageReceived(ChatMessage),

    /// History was loaded and the session is active.
    ///
    /// Carries the fetched messages that were added to the buffer and are
    /// still held in it, oldest first.
    HistoryReady(Vec<ChatMessage>),

    /// A participant left the room.
    UserLeft(Value),

    /// The server rejected a request.
    ServerError {
        /// Server-provided error text.
        message: String,
    },

    /// A send was attempted outside [`ConnectionState::Active`].
    SendRejected {
        /// State at the time of the attempt.
        state: ConnectionState,
    },
}
