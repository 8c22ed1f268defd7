//! Property-based tests for envelope decoding.
//!
//! Decoding sits directly behind the socket, so it must reject or accept any
//! input without panicking, and typed payloads must survive the wire.

use parley_proto::{Envelope, EventKind, Payload, payloads::room::RoomRef};
use proptest::prelude::*;

fn room_event() -> impl Strategy<Value = EventKind> {
    prop_oneof![
        Just(EventKind::JoinRoom),
        Just(EventKind::LeaveRoom),
        Just(EventKind::FetchMessages),
        Just(EventKind::MarkRead),
    ]
}

proptest! {
    #[test]
    fn decode_never_panics(text in ".{0,256}") {
        let _ = Envelope::decode(&text);
    }

    #[test]
    fn decode_never_panics_on_envelope_like_input(
        event in "[a-z-]{0,16}",
        ack in proptest::option::of(any::<u64>()),
        data in "[a-zA-Z0-9:,{}\\[\\]\" ]{0,64}",
    ) {
        let ack = ack.map(|a| format!(",\"ack\":{a}")).unwrap_or_default();
        let text = format!("{{\"event\":\"{event}\"{ack},\"data\":{data}}}");

        if let Ok(envelope) = Envelope::decode(&text) {
            let _ = Payload::from_envelope(&envelope);
        }
    }

    #[test]
    fn room_payloads_survive_the_wire(kind in room_event(), room_id in "[a-z0-9]{1,24}", ack in any::<u64>()) {
        let room = RoomRef::new(room_id);
        let payload = match kind {
            EventKind::JoinRoom => Payload::JoinRoom(room),
            EventKind::LeaveRoom => Payload::LeaveRoom(room),
            EventKind::FetchMessages => Payload::FetchMessages(room),
            _ => Payload::MarkRead(room),
        };

        let text = payload.clone().into_envelope(Some(ack)).unwrap().encode().unwrap();
        let envelope = Envelope::decode(&text).unwrap();

        prop_assert_eq!(envelope.ack, Some(ack));
        prop_assert_eq!(Payload::from_envelope(&envelope).unwrap(), payload);
    }
}
