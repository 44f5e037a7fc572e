//! Typed JSON payloads carried inside frames.
//!
//! [`Frame`] only knows prefixes and raw JSON. This module gives those JSON
//! values shape: the connect info the server opens with, the handshake the
//! client answers with, the three correlated requests a client issues, and the
//! server events a client reacts to.
//!
//! # Invariants
//!
//! Each [`ClientRequest`] variant maps to exactly one outbound event name, and
//! each recognized inbound event name maps to exactly one [`ServerEvent`]
//! variant (enforced by match exhaustiveness).

mod message;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use self::message::{ChatMessage, Expiry};
use crate::{
    AckId, Frame,
    errors::{ProtocolError, Result},
};

/// Outbound event: join a room.
pub const JOIN_ROOM: &str = "joinRoom";
/// Outbound event: fetch recent history.
pub const GET_MESSAGE_HISTORY: &str = "getMessageHistory";
/// Outbound event: post a chat message.
pub const SEND_MESSAGE: &str = "sendMessage";
/// Inbound event: session cookie issued (doubles as a join confirmation).
pub const SET_COOKIE: &str = "setCookie";
/// Inbound event: a chat message was posted.
pub const NEW_MESSAGE: &str = "newMessage";
/// Inbound event: a participant left.
pub const USER_LEFT: &str = "userLeft";

/// Server connect info from the `0` frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectInfo {
    /// Transport session id.
    #[serde(default)]
    pub sid: Option<String>,
    /// Keepalive cadence in milliseconds.
    #[serde(default)]
    pub ping_interval: Option<u64>,
    /// Server-side keepalive timeout in milliseconds.
    #[serde(default)]
    pub ping_timeout: Option<u64>,
}

impl ConnectInfo {
    /// Read connect info from a `0` frame payload.
    ///
    /// Unknown or mistyped fields are treated as absent rather than rejecting
    /// the whole frame, since the only field acted on is `pingInterval`.
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_else(|_| Self {
            sid: value.get("sid").and_then(Value::as_str).map(str::to_string),
            ping_interval: value.get("pingInterval").and_then(Value::as_u64),
            ping_timeout: value.get("pingTimeout").and_then(Value::as_u64),
        })
    }
}

/// Client handshake body sent in the outbound `40` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    /// Origin the client identifies as.
    pub origin: String,
    /// Unix time in milliseconds.
    pub timestamp: u64,
    /// Auth token; always `null` for anonymous sessions.
    pub token: Option<String>,
}

impl Handshake {
    /// Anonymous handshake.
    pub fn new(origin: impl Into<String>, timestamp: u64) -> Self {
        Self { origin: origin.into(), timestamp, token: None }
    }

    /// Build the `40` frame.
    pub fn into_frame(self) -> Result<Frame> {
        Ok(Frame::Connect(Some(to_value("handshake", &self)?)))
    }
}

/// Body of a `joinRoom` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    /// Room to join.
    pub room_id: String,
    /// Display name.
    pub username: String,
}

/// Body of a `getMessageHistory` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMessageHistory {
    /// Room to read.
    pub room_id: String,
    /// Pagination cursor; `null` requests the newest page.
    pub before: Option<String>,
    /// Page size.
    pub limit: usize,
}

/// Body of a `sendMessage` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    /// Target room.
    pub room_id: String,
    /// Text body.
    pub message: String,
    /// Display name.
    pub username: String,
}

/// Correlated requests a client sends as `42<id>[name, body]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    /// Join a room.
    JoinRoom(JoinRoom),
    /// Fetch recent history.
    GetMessageHistory(GetMessageHistory),
    /// Post a message.
    SendMessage(SendMessage),
}

impl ClientRequest {
    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => JOIN_ROOM,
            Self::GetMessageHistory(_) => GET_MESSAGE_HISTORY,
            Self::SendMessage(_) => SEND_MESSAGE,
        }
    }

    /// Build the correlated event frame.
    pub fn into_frame(self, ack_id: AckId) -> Result<Frame> {
        let name = self.name();
        let body = match &self {
            Self::JoinRoom(body) => to_value(JOIN_ROOM, body)?,
            Self::GetMessageHistory(body) => to_value(GET_MESSAGE_HISTORY, body)?,
            Self::SendMessage(body) => to_value(SEND_MESSAGE, body)?,
        };
        Ok(Frame::event(name, Some(ack_id), vec![body]))
    }
}

/// Inbound events a client reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Session cookie issued. Carries the raw arguments.
    SetCookie(Vec<Value>),
    /// A message was posted to the room.
    NewMessage(ChatMessage),
    /// A participant left. Carries the raw info object.
    UserLeft(Value),
    /// Any other event name.
    Other {
        /// Event name.
        name: String,
    },
}

impl ServerEvent {
    /// Interpret an event frame's name and arguments.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidEventPayload` if a `newMessage` argument is not
    ///   a chat message
    pub fn from_event(name: &str, args: Vec<Value>) -> Result<Self> {
        match name {
            SET_COOKIE => Ok(Self::SetCookie(args)),
            NEW_MESSAGE => {
                let raw = args.into_iter().next().unwrap_or(Value::Null);
                serde_json::from_value(raw).map(Self::NewMessage).map_err(|e| {
                    ProtocolError::InvalidEventPayload {
                        event: NEW_MESSAGE.to_string(),
                        reason: e.to_string(),
                    }
                })
            },
            USER_LEFT => Ok(Self::UserLeft(args.into_iter().next().unwrap_or(Value::Null))),
            other => Ok(Self::Other { name: other.to_string() }),
        }
    }
}

/// Locate the message array inside an acknowledgment payload.
///
/// Accepted shapes:
/// - a bare array of messages: `[{..}, {..}]`
/// - an object with a `messages` array: `{"messages": [..]}`
/// - an array whose first element is either of the above: `[[{..}]]`,
///   `[{"messages": [..]}]`
///
/// Returns `None` when no array can be found.
pub fn history_array(payload: &Value) -> Option<&[Value]> {
    match payload {
        Value::Object(map) => map.get("messages").and_then(Value::as_array).map(Vec::as_slice),
        Value::Array(items) => match items.first() {
            Some(Value::Array(inner)) => Some(inner.as_slice()),
            Some(Value::Object(map)) if map.contains_key("messages") => {
                map.get("messages").and_then(Value::as_array).map(Vec::as_slice)
            },
            _ => Some(items.as_slice()),
        },
        _ => None,
    }
}

/// Decode every element of a history array that is a valid chat message.
///
/// Returns the decoded messages and the number of elements skipped.
pub fn decode_history(items: &[Value]) -> (Vec<ChatMessage>, usize) {
    let mut messages = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for item in items {
        match serde_json::from_value::<ChatMessage>(item.clone()) {
            Ok(message) => messages.push(message),
            Err(_) => skipped += 1,
        }
    }
    (messages, skipped)
}

/// Extract a server-reported error from an acknowledgment payload.
///
/// Looks for a non-null `error` field on the payload object or on the first
/// element of the payload array.
pub fn ack_error(payload: &Value) -> Option<String> {
    let object = match payload {
        Value::Array(items) => items.first()?,
        other => other,
    };

    match object.get("error")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

fn to_value<T: Serialize>(what: &'static str, body: &T) -> Result<Value> {
    serde_json::to_value(body)
        .map_err(|e| ProtocolError::Serialize { what, reason: e.to_string() })
}
