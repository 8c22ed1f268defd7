//! Shared chat data model.
//!
//! These types appear both inside payloads and in client state. Field names
//! are camelCase on the wire. Deserialization accepts the legacy field names
//! of the original socket server (`_id`, `user`, `name`, `participants`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Room identifier assigned by the server.
pub type RoomId = String;

/// Message identifier. Client-generated until the server confirms the message.
pub type MessageId = String;

/// User identifier assigned by the authentication backend.
pub type UserId = String;

/// Identity of a user as shown next to their messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// Stable user ID.
    #[serde(alias = "_id")]
    pub id: UserId,
    /// Name shown in the UI.
    #[serde(alias = "name")]
    pub display_name: String,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserIdentity {
    /// Create an identity without an avatar.
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self { id: id.into(), display_name: display_name.into(), avatar: None }
    }

    /// Set the avatar URL.
    #[must_use]
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

/// Delivery state of a message in the local timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    /// Shown optimistically, waiting for the server acknowledgement.
    Pending,
    /// Acknowledged by the server with a canonical ID.
    #[default]
    Confirmed,
    /// Generated by the server (joins, renames).
    System,
    /// The send was not acknowledged. Can be retried.
    Failed,
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message ID (temporary while pending).
    #[serde(alias = "_id")]
    pub id: MessageId,
    /// Message body.
    pub text: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Author.
    #[serde(alias = "user")]
    pub sender: UserIdentity,
    /// Room the message belongs to. Empty if the server omitted it.
    #[serde(default)]
    pub room_id: RoomId,
    /// Delivery state. Server payloads default to `confirmed`.
    #[serde(default)]
    pub state: MessageState,
}

impl ChatMessage {
    /// Whether this message still waits for (or failed to get) an
    /// acknowledgement.
    #[must_use]
    pub fn is_unconfirmed(&self) -> bool {
        matches!(self.state, MessageState::Pending | MessageState::Failed)
    }
}

/// Preview of the most recent message in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    /// Message body.
    pub text: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Author ID.
    pub sender_id: UserId,
}

impl From<&ChatMessage> for LastMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            text: message.text.clone(),
            created_at: message.created_at,
            sender_id: message.sender.id.clone(),
        }
    }
}

/// A chat room the user participates in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    /// Room ID.
    pub id: RoomId,
    /// Display name. Empty for unnamed rooms.
    #[serde(default)]
    pub name: String,
    /// Participant user IDs.
    #[serde(default, alias = "participants")]
    pub participant_ids: Vec<UserId>,
    /// Most recent message preview.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessage>,
    /// Messages the user has not read yet.
    #[serde(default)]
    pub unread_count: u32,
}

impl ChatRoom {
    /// Create an empty room with the given ID and name.
    pub fn new(id: impl Into<RoomId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            participant_ids: Vec::new(),
            last_message: None,
            unread_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn server_message_defaults_to_confirmed() {
        let message: ChatMessage = serde_json::from_value(json!({
            "id": "m1",
            "text": "hi",
            "createdAt": "2024-05-01T10:00:00Z",
            "sender": { "id": "u1", "displayName": "Ann" },
            "roomId": "r1",
        }))
        .unwrap();

        assert_eq!(message.state, MessageState::Confirmed);
        assert_eq!(message.sender.avatar, None);
    }

    #[test]
    fn legacy_field_names_are_accepted() {
        let message: ChatMessage = serde_json::from_value(json!({
            "_id": "m1",
            "text": "hi",
            "createdAt": "2024-05-01T10:00:00.000Z",
            "user": { "_id": "u1", "name": "Ann", "avatar": "https://a/1.png" },
        }))
        .unwrap();

        assert_eq!(message.id, "m1");
        assert_eq!(message.sender.display_name, "Ann");
        assert_eq!(message.room_id, "");

        let room: ChatRoom =
            serde_json::from_value(json!({ "id": "r1", "participants": ["u1", "u2"] })).unwrap();
        assert_eq!(room.participant_ids, vec!["u1", "u2"]);
        assert_eq!(room.unread_count, 0);
        assert!(room.last_message.is_none());
    }

    #[test]
    fn state_serializes_lowercase() {
        assert_eq!(serde_json::to_value(MessageState::Pending).unwrap(), json!("pending"));
        assert_eq!(serde_json::to_value(MessageState::Failed).unwrap(), json!("failed"));
    }
}
