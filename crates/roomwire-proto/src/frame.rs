//! Frame type and text codec.
//!
//! A `Frame` is one protocol-level message unit. On the wire it is a run of
//! ASCII digits (the prefix) followed by an optional JSON payload. The prefix
//! alone selects the frame kind, so dispatch never needs to look at the
//! payload.
//!
//! Decoding is permissive about what it does not know: a prefix outside the
//! recognized set yields `Ok(None)` and the caller drops the frame. Decoding is
//! strict about what it does know: a recognized prefix followed by a payload
//! that is not valid JSON yields an error.

use std::fmt;

use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Correlation identifier carried by `42<d>` requests and `43<d>` acks.
///
/// # Invariants
///
/// - Always in `0..=9` (exactly one digit on the wire). Enforced by
///   [`AckId::new`], the only constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AckId(u8);

impl AckId {
    /// Number of distinct identifiers (`0..=9`).
    pub const SPACE: u8 = 10;

    /// First identifier in the cycle.
    pub const MIN: Self = Self(0);

    /// Create an ack id. `None` if `value > 9`.
    pub const fn new(value: u8) -> Option<Self> {
        if value < Self::SPACE { Some(Self(value)) } else { None }
    }

    /// Numeric value in `0..=9`.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Slot index for table lookups.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Next identifier in the cycle (9 wraps to 0).
    #[must_use]
    pub const fn next(self) -> Self {
        Self((self.0 + 1) % Self::SPACE)
    }

    fn from_digit(byte: u8) -> Option<Self> {
        byte.checked_sub(b'0').and_then(Self::new)
    }
}

impl TryFrom<u8> for AckId {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value).ok_or(ProtocolError::AckIdOutOfRange(value))
    }
}

impl fmt::Display for AckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decoded protocol frame.
///
/// | Prefix      | Variant                              |
/// |-------------|--------------------------------------|
/// | `0`         | [`Frame::Open`]                      |
/// | `40`        | [`Frame::Connect`]                   |
/// | `41`        | [`Frame::Disconnect`]                |
/// | `42`, `42d` | [`Frame::Event`]                     |
/// | `43`, `43d` | [`Frame::Ack`]                       |
/// | `2`         | [`Frame::Ping`]                      |
/// | `3`         | [`Frame::Pong`]                      |
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Server connect info, sent once when the socket opens.
    Open(Value),

    /// Handshake. Outbound it carries origin and timestamp, inbound it is the
    /// server's acceptance and usually has no payload.
    Connect(Option<Value>),

    /// Server-initiated disconnect with an optional reason.
    Disconnect(Option<Value>),

    /// Named event. `ack_id` is set on correlated requests.
    Event {
        /// Correlation id, present only on `42<d>` frames.
        ack_id: Option<AckId>,
        /// Event name (first array element).
        name: String,
        /// Remaining array elements.
        args: Vec<Value>,
    },

    /// Acknowledgment. `id` is set on `43<d>` frames.
    Ack {
        /// Correlation id of the request being answered.
        id: Option<AckId>,
        /// Raw acknowledgment payload, usually an array of ack arguments.
        payload: Value,
    },

    /// Keepalive ping.
    Ping,

    /// Keepalive reply.
    Pong,
}

impl Frame {
    /// Build a correlated or uncorrelated event frame.
    pub fn event(name: impl Into<String>, ack_id: Option<AckId>, args: Vec<Value>) -> Self {
        Self::Event { ack_id, name: name.into(), args }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Open(_) => "open",
            Self::Connect(_) => "connect",
            Self::Disconnect(_) => "disconnect",
            Self::Event { .. } => "event",
            Self::Ack { .. } => "ack",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }

    /// Decode one text frame.
    ///
    /// Returns `Ok(None)` when the leading digit run is not a recognized
    /// prefix. Such frames are meant to be dropped without further handling.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidJson` if the payload after a recognized prefix
    ///   does not parse
    /// - `ProtocolError::MissingPayload` if `0` or `43` has no payload
    /// - `ProtocolError::EventNotArray` / `MissingEventName` for malformed
    ///   event frames
    pub fn decode(text: &str) -> Result<Option<Self>> {
        let digits = text.bytes().take_while(u8::is_ascii_digit).count();
        let (prefix, body) = text.split_at(digits);

        let frame = match prefix.as_bytes() {
            b"0" => Self::Open(required_json(prefix, body)?),
            b"2" => Self::Ping,
            b"3" => Self::Pong,
            b"40" => Self::Connect(optional_json(prefix, body)?),
            b"41" => Self::Disconnect(optional_json(prefix, body)?),
            b"42" => decode_event(None, prefix, body)?,
            b"43" => Self::Ack { id: None, payload: required_json(prefix, body)? },
            [b'4', b'2', digit] => match AckId::from_digit(*digit) {
                Some(id) => decode_event(Some(id), prefix, body)?,
                None => return Ok(None),
            },
            [b'4', b'3', digit] => match AckId::from_digit(*digit) {
                Some(id) => Self::Ack { id: Some(id), payload: required_json(prefix, body)? },
                None => return Ok(None),
            },
            _ => return Ok(None),
        };

        Ok(Some(frame))
    }

    /// Encode to wire text. Inverse of [`Frame::decode`].
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(value) => write!(f, "0{value}"),
            Self::Connect(None) => f.write_str("40"),
            Self::Connect(Some(value)) => write!(f, "40{value}"),
            Self::Disconnect(None) => f.write_str("41"),
            Self::Disconnect(Some(value)) => write!(f, "41{value}"),
            Self::Event { ack_id, name, args } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                f.write_str("42")?;
                if let Some(id) = ack_id {
                    write!(f, "{id}")?;
                }
                write!(f, "{}", Value::Array(array))
            },
            Self::Ack { id, payload } => {
                f.write_str("43")?;
                if let Some(id) = id {
                    write!(f, "{id}")?;
                }
                write!(f, "{payload}")
            },
            Self::Ping => f.write_str("2"),
            Self::Pong => f.write_str("3"),
        }
    }
}

fn parse_json(prefix: &str, body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| ProtocolError::InvalidJson {
        prefix: prefix.to_string(),
        reason: e.to_string(),
    })
}

fn required_json(prefix: &str, body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Err(ProtocolError::MissingPayload { prefix: prefix.to_string() });
    }
    parse_json(prefix, body)
}

fn optional_json(prefix: &str, body: &str) -> Result<Option<Value>> {
    if body.trim().is_empty() { Ok(None) } else { parse_json(prefix, body).map(Some) }
}

fn decode_event(ack_id: Option<AckId>, prefix: &str, body: &str) -> Result<Frame> {
    let Value::Array(mut items) = required_json(prefix, body)? else {
        return Err(ProtocolError::EventNotArray);
    };

    if items.is_empty() {
        return Err(ProtocolError::MissingEventName);
    }

    let Value::String(name) = items.remove(0) else {
        return Err(ProtocolError::MissingEventName);
    };

    Ok(Frame::Event { ack_id, name, args: items })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decode_connect_info() {
        let frame = Frame::decode(r#"0{"sid":"abc","pingInterval":25000}"#).unwrap();
        assert_eq!(frame, Some(Frame::Open(json!({"sid": "abc", "pingInterval": 25000}))));
    }

    #[test]
    fn decode_handshake_ack_without_payload() {
        assert_eq!(Frame::decode("40").unwrap(), Some(Frame::Connect(None)));
    }

    #[test]
    fn decode_disconnect_with_and_without_reason() {
        assert_eq!(Frame::decode("41").unwrap(), Some(Frame::Disconnect(None)));
        assert_eq!(
            Frame::decode(r#"41{"reason":"kicked"}"#).unwrap(),
            Some(Frame::Disconnect(Some(json!({"reason": "kicked"}))))
        );
    }

    #[test]
    fn decode_uncorrelated_event() {
        let frame = Frame::decode(r#"42["newMessage",{"id":"m1"}]"#).unwrap().unwrap();
        assert_eq!(frame, Frame::Event {
            ack_id: None,
            name: "newMessage".into(),
            args: vec![json!({"id": "m1"})],
        });
    }

    #[test]
    fn decode_correlated_event() {
        let frame = Frame::decode(r#"427["joinRoom",{"roomId":"r"}]"#).unwrap().unwrap();
        assert!(matches!(frame, Frame::Event { ack_id: Some(id), .. } if id.get() == 7));
    }

    #[test]
    fn decode_generic_and_correlated_ack() {
        assert_eq!(
            Frame::decode("43[]").unwrap(),
            Some(Frame::Ack { id: None, payload: json!([]) })
        );
        assert_eq!(
            Frame::decode(r#"430[{"error":null}]"#).unwrap(),
            Some(Frame::Ack { id: AckId::new(0), payload: json!([{"error": null}]) })
        );
    }

    #[test]
    fn decode_ping_pong() {
        assert_eq!(Frame::decode("2").unwrap(), Some(Frame::Ping));
        assert_eq!(Frame::decode("3").unwrap(), Some(Frame::Pong));
    }

    #[test]
    fn unknown_prefixes_are_dropped() {
        for text in ["", "1", "5", "44", "4312[]", "20", "hello", "6{}"] {
            assert_eq!(Frame::decode(text).unwrap(), None, "{text:?}");
        }
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(Frame::decode("0{not json"), Err(ProtocolError::InvalidJson { .. })));
        assert!(matches!(Frame::decode("42[\"x\","), Err(ProtocolError::InvalidJson { .. })));
        assert!(matches!(Frame::decode("431{"), Err(ProtocolError::InvalidJson { .. })));
    }

    #[test]
    fn malformed_event_shapes_are_errors() {
        assert_eq!(Frame::decode(r#"42{"a":1}"#), Err(ProtocolError::EventNotArray));
        assert_eq!(Frame::decode("42[]"), Err(ProtocolError::MissingEventName));
        assert_eq!(Frame::decode("42[1,2]"), Err(ProtocolError::MissingEventName));
    }

    #[test]
    fn connect_info_requires_payload() {
        assert!(matches!(Frame::decode("0"), Err(ProtocolError::MissingPayload { .. })));
    }

    #[test]
    fn ack_id_cycles() {
        let nine = AckId::new(9).unwrap();
        assert_eq!(nine.next().get(), 0);
        assert!(AckId::new(10).is_none());
        assert_eq!(AckId::try_from(12), Err(ProtocolError::AckIdOutOfRange(12)));
    }

    #[test]
    fn encode_matches_wire_format() {
        assert_eq!(Frame::Ping.encode(), "2");
        assert_eq!(Frame::Pong.encode(), "3");
        assert_eq!(Frame::Connect(None).encode(), "40");
        let frame = Frame::event("joinRoom", AckId::new(3), vec![json!({"roomId": "lobby"})]);
        assert_eq!(frame.encode(), r#"423["joinRoom",{"roomId":"lobby"}]"#);
    }
}
