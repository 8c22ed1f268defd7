//! Typed event payloads.
//!
//! Envelopes carry raw JSON; this module gives each protocol event a typed
//! payload. The event name in the envelope selects the payload type, so the
//! JSON `data` holds only the inner struct (no variant tag).
//!
//! # Invariants
//!
//! Each payload variant maps to exactly one [`EventKind`] (enforced by match
//! exhaustiveness). Acknowledgements are not payloads: their shape depends on
//! the request they answer and is decoded with [`Envelope::ack_data`].

pub mod chat;
pub mod room;

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    Envelope, EventKind,
    errors::{ProtocolError, Result},
};
use chat::{ChatMessage, ChatRoom};
use room::{CreateRoomRequest, RoomRef, SendMessageRequest};

/// All typed protocol payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    // Client requests
    /// Subscribe to a room.
    JoinRoom(RoomRef),
    /// Unsubscribe from a room.
    LeaveRoom(RoomRef),
    /// Request the room list. Carries an empty object.
    FetchRooms,
    /// Request a room's history.
    FetchMessages(RoomRef),
    /// Post a message.
    SendMessage(SendMessageRequest),
    /// Read-receipt.
    MarkRead(RoomRef),
    /// Create a room.
    CreateRoom(CreateRoomRequest),

    // Server pushes
    /// Message posted to one of the user's rooms.
    NewMessage(ChatMessage),
    /// Room metadata changed.
    RoomUpdated(ChatRoom),
    /// User was added to a room.
    NewRoom(ChatRoom),
}

impl Payload {
    /// Event kind corresponding to this payload.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::JoinRoom(_) => EventKind::JoinRoom,
            Self::LeaveRoom(_) => EventKind::LeaveRoom,
            Self::FetchRooms => EventKind::FetchRooms,
            Self::FetchMessages(_) => EventKind::FetchMessages,
            Self::SendMessage(_) => EventKind::SendMessage,
            Self::MarkRead(_) => EventKind::MarkRead,
            Self::CreateRoom(_) => EventKind::CreateRoom,
            Self::NewMessage(_) => EventKind::NewMessage,
            Self::RoomUpdated(_) => EventKind::RoomUpdated,
            Self::NewRoom(_) => EventKind::NewRoom,
        }
    }

    /// Wrap this payload in an envelope.
    ///
    /// `ack` should be `Some` exactly when [`EventKind::expects_ack`] holds
    /// for this payload; the envelope is built either way.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::JsonEncode` if the payload cannot be serialized
    pub fn into_envelope(self, ack: Option<u64>) -> Result<Envelope> {
        let kind = self.kind();

        let data = match self {
            Self::FetchRooms => Ok(serde_json::Value::Object(serde_json::Map::new())),
            Self::JoinRoom(inner)
            | Self::LeaveRoom(inner)
            | Self::FetchMessages(inner)
            | Self::MarkRead(inner) => to_value(&inner),
            Self::SendMessage(inner) => to_value(&inner),
            Self::CreateRoom(inner) => to_value(&inner),
            Self::NewMessage(inner) => to_value(&inner),
            Self::RoomUpdated(inner) | Self::NewRoom(inner) => to_value(&inner),
        }?;

        Ok(Envelope::new(kind, ack, data))
    }

    /// Decode the typed payload of an envelope.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownEvent` if the event name is not in the protocol
    /// - `ProtocolError::AckWithoutPayload` for `ack` envelopes
    /// - `ProtocolError::InvalidPayload` if the data has the wrong shape
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        let Some(kind) = envelope.kind() else {
            return Err(ProtocolError::UnknownEvent(envelope.event.clone()));
        };

        let data = &envelope.data;
        let payload = match kind {
            EventKind::JoinRoom => Self::JoinRoom(from_value(kind, data)?),
            EventKind::LeaveRoom => Self::LeaveRoom(from_value(kind, data)?),
            EventKind::FetchRooms => Self::FetchRooms,
            EventKind::FetchMessages => Self::FetchMessages(from_value(kind, data)?),
            EventKind::SendMessage => Self::SendMessage(from_value(kind, data)?),
            EventKind::MarkRead => Self::MarkRead(from_value(kind, data)?),
            EventKind::CreateRoom => Self::CreateRoom(from_value(kind, data)?),
            EventKind::NewMessage => Self::NewMessage(from_value(kind, data)?),
            EventKind::RoomUpdated => Self::RoomUpdated(from_value(kind, data)?),
            EventKind::NewRoom => Self::NewRoom(from_value(kind, data)?),
            EventKind::Ack => return Err(ProtocolError::AckWithoutPayload),
        };

        Ok(payload)
    }
}

fn to_value<T: Serialize>(inner: &T) -> Result<serde_json::Value> {
    serde_json::to_value(inner).map_err(|e| ProtocolError::JsonEncode(e.to_string()))
}

fn from_value<T: DeserializeOwned>(kind: EventKind, data: &serde_json::Value) -> Result<T> {
    T::deserialize(data)
        .map_err(|e| ProtocolError::InvalidPayload { event: kind.as_str(), reason: e.to_string() })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn send_message_wire_shape() {
        let payload = Payload::SendMessage(SendMessageRequest {
            text: "hi".to_string(),
            room_id: "r1".to_string(),
        });
        let envelope = payload.into_envelope(Some(7)).unwrap();

        insta::assert_snapshot!(
            envelope.encode().unwrap(),
            @r#"{"event":"send-message","ack":7,"data":{"text":"hi","roomId":"r1"}}"#
        );
    }

    #[test]
    fn fetch_rooms_carries_empty_object() {
        let envelope = Payload::FetchRooms.into_envelope(Some(1)).unwrap();
        assert_eq!(envelope.data, json!({}));
        assert_eq!(Payload::from_envelope(&envelope).unwrap(), Payload::FetchRooms);
    }

    #[test]
    fn create_room_accepts_legacy_participants() {
        let envelope = Envelope::new(
            EventKind::CreateRoom,
            Some(3),
            json!({ "participants": ["u2", "u1"], "name": "Bob" }),
        );

        let Payload::CreateRoom(request) = Payload::from_envelope(&envelope).unwrap() else {
            panic!("expected create-room payload");
        };
        assert_eq!(request.participant_ids, vec!["u2", "u1"]);
        assert_eq!(request.name, "Bob");
    }

    #[test]
    fn push_decodes_to_typed_payload() {
        let envelope = Envelope::new(
            EventKind::RoomUpdated,
            None,
            json!({ "id": "r1", "name": "General", "unreadCount": 2 }),
        );

        match Payload::from_envelope(&envelope).unwrap() {
            Payload::RoomUpdated(room) => {
                assert_eq!(room.id, "r1");
                assert_eq!(room.unread_count, 2);
            },
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn malformed_push_is_invalid_payload() {
        let envelope = Envelope::new(EventKind::NewMessage, None, json!({ "text": 5 }));
        assert!(matches!(
            Payload::from_envelope(&envelope),
            Err(ProtocolError::InvalidPayload { event: "new-message", .. })
        ));
    }

    #[test]
    fn ack_and_unknown_have_no_payload() {
        let ack = Envelope::new(EventKind::Ack, Some(1), json!([]));
        assert_eq!(Payload::from_envelope(&ack), Err(ProtocolError::AckWithoutPayload));

        let unknown = Envelope { event: "typing".into(), ack: None, data: json!({}) };
        assert_eq!(
            Payload::from_envelope(&unknown),
            Err(ProtocolError::UnknownEvent("typing".into()))
        );
    }
}
