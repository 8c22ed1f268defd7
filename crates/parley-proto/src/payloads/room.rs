//! Request payloads and typed acknowledgements.

use serde::{Deserialize, Serialize};

use super::chat::{RoomId, UserId};

/// Payload naming a single room (`join-room`, `leave-room`,
/// `fetch-messages`, `mark-read`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    /// Target room.
    pub room_id: RoomId,
}

impl RoomRef {
    /// Reference the given room.
    pub fn new(room_id: impl Into<RoomId>) -> Self {
        Self { room_id: room_id.into() }
    }
}

/// `send-message` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Message body.
    pub text: String,
    /// Target room.
    pub room_id: RoomId,
}

/// `create-room` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Participants, including the requesting user.
    #[serde(alias = "participants")]
    pub participant_ids: Vec<UserId>,
    /// Room name. Empty for unnamed rooms.
    #[serde(default)]
    pub name: String,
}

/// Acknowledgement of `create-room`: either a room ID or an error string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomReply {
    /// ID of the created room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    /// Server-provided failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CreateRoomReply {
    /// Successful reply.
    pub fn created(room_id: impl Into<RoomId>) -> Self {
        Self { room_id: Some(room_id.into()), error: None }
    }

    /// Failed reply.
    pub fn failed(error: impl Into<String>) -> Self {
        Self { room_id: None, error: Some(error.into()) }
    }

    /// Collapse into the room ID or the error string.
    ///
    /// An error wins over a room ID. A reply with neither is malformed.
    pub fn into_result(self) -> Result<RoomId, String> {
        match (self.error, self.room_id) {
            (Some(error), _) => Err(error),
            (None, Some(room_id)) => Ok(room_id),
            (None, None) => Err("malformed create-room reply".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_wins_over_room_id() {
        let reply = CreateRoomReply { room_id: Some("r1".into()), error: Some("denied".into()) };
        assert_eq!(reply.into_result(), Err("denied".to_string()));
    }

    #[test]
    fn empty_reply_is_malformed() {
        assert!(CreateRoomReply::default().into_result().is_err());
        assert_eq!(CreateRoomReply::created("r9").into_result(), Ok("r9".to_string()));
    }
}
