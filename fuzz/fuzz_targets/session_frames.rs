//! Fuzz target for the Session state machine
//!
//! Drive a session with arbitrary interleavings of caller intents, transport
//! signals, time and raw frames.
//!
//! # Strategy
//!
//! - Raw frames: arbitrary text, plus well-formed frames for every prefix
//! - Transport churn: opens, failures and closes in any order
//! - Time: jumps from zero up to a minute
//!
//! # Invariants
//!
//! - History never exceeds its capacity
//! - At most ten requests are in flight
//! - No keepalive runs while disconnected
//! - Give-up is announced at most once between explicit connects
//! - NEVER panic

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use roomwire_core::{
    env::{test_utils::MockEnv, Environment},
    ConnectionState, Session, SessionAction, SessionConfig, SessionEvent, SessionNotice,
};

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Connect,
    Disconnect,
    Send(String),
    Opened,
    Failed,
    Closed,
    Advance(u16),
    Raw(String),
    Known(KnownFrame),
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum KnownFrame {
    Open(u16),
    HandshakeAck,
    ServerDisconnect,
    JoinAck(u8),
    HistoryAck(u8),
    BareAck,
    SetCookie,
    NewMessage(u8),
    Ping,
}

impl KnownFrame {
    fn text(self) -> String {
        match self {
            Self::Open(interval) => format!(r#"0{{"pingInterval":{interval}}}"#),
            Self::HandshakeAck => "40".to_string(),
            Self::ServerDisconnect => "41".to_string(),
            Self::JoinAck(id) => format!(r#"43{}[{{"error":null}}]"#, id % 10),
            Self::HistoryAck(id) => format!(r#"43{}[[{{"id":"h{id}"}}]]"#, id % 10),
            Self::BareAck => r#"43{"messages":[{"id":"b"}]}"#.to_string(),
            Self::SetCookie => r#"42["setCookie","c"]"#.to_string(),
            Self::NewMessage(n) => format!(r#"42["newMessage",{{"id":"n{n}"}}]"#),
            Self::Ping => "2".to_string(),
        }
    }
}

#[derive(Debug, Arbitrary)]
struct Input {
    capacity: u8,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let capacity = usize::from(input.capacity % 8) + 1;
    let Ok(config) = SessionConfig::new("fuzz").and_then(|c| c.with_history_capacity(capacity))
    else {
        return;
    };

    let env = MockEnv::new();
    let mut session = Session::new(env.clone(), config);
    let mut gave_up = 0;

    for op in input.ops.into_iter().take(256) {
        let event = match op {
            Op::Connect => {
                gave_up = 0;
                SessionEvent::Connect
            }
            Op::Disconnect => SessionEvent::Disconnect,
            Op::Send(text) => SessionEvent::SendMessage { text },
            Op::Opened => SessionEvent::TransportOpened,
            Op::Failed => SessionEvent::TransportFailed { reason: "fuzz".into() },
            Op::Closed => SessionEvent::TransportClosed { reason: "fuzz".into() },
            Op::Advance(millis) => {
                env.advance(Duration::from_millis(u64::from(millis)));
                SessionEvent::Tick { now: env.now() }
            }
            Op::Raw(text) => SessionEvent::FrameReceived(text),
            Op::Known(frame) => SessionEvent::FrameReceived(frame.text()),
        };

        for action in session.handle(event) {
            if let SessionAction::Notify(SessionNotice::GaveUp { .. }) = action {
                gave_up += 1;
            }
        }

        assert!(session.messages(None).len() <= capacity);
        assert!(session.pending_requests() <= 10);
        if session.state() == ConnectionState::Disconnected {
            assert!(session.keepalive_interval().is_none());
        }
        assert!(gave_up <= 1);
    }
});
