//! Property-based tests for the frame codec.
//!
//! The codec sits directly on untrusted socket input, so these tests focus on
//! totality (no input panics), prefix dispatch, and that frames the client
//! builds decode back to the same frame.

use proptest::prelude::*;
use roomwire_proto::{
    AckId, Frame, Handshake, ProtocolError,
    payloads::{ClientRequest, SendMessage},
};
use serde_json::{Value, json};

/// Strategy for JSON leaves that survive a text round trip unchanged.
fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
    ]
}

/// Strategy for small JSON trees.
fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Strategy for arrays and objects.
///
/// Payloads directly after a prefix must not start with a digit, or the digit
/// would extend the prefix.
fn json_container() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::collection::vec(json_value(), 0..4).prop_map(Value::Array),
        prop::collection::btree_map("[a-z]{1,8}", json_value(), 0..4)
            .prop_map(|map| Value::Object(map.into_iter().collect())),
    ]
}

/// Strategy for frames the client or server can put on the wire.
fn arbitrary_frame() -> impl Strategy<Value = Frame> {
    let ack_id = prop::option::of((0u8..10).prop_filter_map("ack id in range", AckId::new));
    prop_oneof![
        Just(Frame::Ping),
        Just(Frame::Pong),
        prop::option::of(json_container()).prop_map(Frame::Disconnect),
        prop::collection::btree_map("[a-z]{1,8}", json_leaf(), 0..4)
            .prop_map(|map| Frame::Open(Value::Object(map.into_iter().collect()))),
        (ack_id.clone(), "[a-zA-Z]{1,12}", prop::collection::vec(json_value(), 0..3))
            .prop_map(|(ack_id, name, args)| Frame::Event { ack_id, name, args }),
        (ack_id, json_container()).prop_map(|(id, payload)| Frame::Ack { id, payload }),
    ]
}

#[test]
fn prop_decode_never_panics() {
    proptest!(|(text in ".{0,64}")| {
        let _ = Frame::decode(&text);
    });
}

#[test]
fn prop_decode_never_panics_on_recognized_prefixes() {
    let prefixes = prop::sample::select(vec!["0", "2", "3", "40", "41", "42", "43", "425", "439"]);
    proptest!(|(prefix in prefixes, body in ".{0,48}")| {
        let _ = Frame::decode(&format!("{prefix}{body}"));
    });
}

#[test]
fn prop_encoded_frames_decode_to_themselves() {
    proptest!(|(frame in arbitrary_frame())| {
        let wire = frame.encode();
        let decoded = Frame::decode(&wire).expect("encoded frame should decode");

        // PROPERTY: What we send is what the peer reads
        prop_assert_eq!(decoded, Some(frame));
    });
}

#[test]
fn prop_unrecognized_digit_runs_are_dropped() {
    proptest!(|(run in "[0-9]{1,6}", body in "[\\[{a-z].{0,16}")| {
        let recognized = matches!(run.as_str(), "0" | "2" | "3" | "40" | "41" | "42" | "43")
            || (run.len() == 3 && (run.starts_with("42") || run.starts_with("43")));
        prop_assume!(!recognized);

        // PROPERTY: Unknown prefixes never error, they are silently dropped
        prop_assert_eq!(Frame::decode(&format!("{run}{body}")), Ok(None));
    });
}

#[test]
fn handshake_frame_snapshot() {
    let frame = Handshake::new("https://chat.example", 1_714_600_000_000)
        .into_frame()
        .expect("handshake serializes");

    insta::assert_snapshot!(
        frame.encode(),
        @r#"40{"origin":"https://chat.example","timestamp":1714600000000,"token":null}"#
    );
}

#[test]
fn send_message_frame_snapshot() {
    let request = ClientRequest::SendMessage(SendMessage {
        room_id: "lobby".into(),
        message: "hi there".into(),
        username: "ada".into(),
    });
    let frame = request.into_frame(AckId::new(4).expect("in range")).expect("serializes");

    insta::assert_snapshot!(
        frame.encode(),
        @r#"424["sendMessage",{"message":"hi there","roomId":"lobby","username":"ada"}]"#
    );
}

#[test]
fn history_ack_with_nested_array_decodes() {
    let frame = Frame::decode(r#"431[[{"id":"m1","message":"hello"}]]"#)
        .expect("valid json")
        .expect("recognized prefix");

    match frame {
        Frame::Ack { id, payload } => {
            assert_eq!(id.map(AckId::get), Some(1));
            assert_eq!(payload, json!([[{"id": "m1", "message": "hello"}]]));
        },
        other => panic!("expected ack, got {other:?}"),
    }
}

#[test]
fn malformed_payload_after_known_prefix_errors() {
    assert!(matches!(
        Frame::decode(r#"42["newMessage",{"id":"#),
        Err(ProtocolError::InvalidJson { .. })
    ));
}
