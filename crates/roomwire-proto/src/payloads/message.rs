//! Chat message record.

use serde::{Deserialize, Serialize};

/// Expiry instant of a message.
///
/// Servers send either an ISO-8601 string or epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expiry {
    /// Epoch milliseconds.
    Millis(u64),
    /// ISO-8601 timestamp.
    Iso(String),
}

/// One chat message as delivered by `newMessage` events and history fetches.
///
/// Immutable once received. Only `id` is required on decode; servers are
/// inconsistent about the remaining fields so they all default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Server-assigned message identifier.
    pub id: String,

    /// Room the message belongs to.
    #[serde(default)]
    pub room_id: String,

    /// Sender display name.
    #[serde(default)]
    pub username: String,

    /// Sender address or handle.
    #[serde(default)]
    pub address: Option<String>,

    /// Text body.
    #[serde(default)]
    pub message: String,

    /// Profile image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// ISO-8601 send time.
    #[serde(default)]
    pub timestamp: String,

    /// Message kind tag (`type` on the wire).
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    /// When the server will drop the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Expiry>,
}
