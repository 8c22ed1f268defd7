//! Room directory.
//!
//! Ordered list of the rooms the user participates in, with last-message
//! previews and unread counters. Rooms are merged by ID, so repeated updates
//! for the same room are idempotent regardless of the order they arrive in.

use std::collections::HashMap;

use parley_proto::{ChatMessage, ChatRoom, LastMessage, RoomId};

use crate::error::ClientError;

/// Live room list.
///
/// # Invariants
///
/// - Room IDs are unique.
/// - The active room (as passed by the caller) has `unread_count == 0` after
///   every mutation that is told about it.
#[derive(Debug, Clone, Default)]
pub struct RoomDirectory {
    rooms: Vec<ChatRoom>,
    index: HashMap<RoomId, usize>,
    loading: bool,
}

impl RoomDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rooms in server order, with rooms pushed later appended.
    pub fn iter(&self) -> impl Iterator<Item = &ChatRoom> {
        self.rooms.iter()
    }

    /// Room by ID.
    #[must_use]
    pub fn get(&self, room_id: &str) -> Option<&ChatRoom> {
        self.index.get(room_id).map(|&slot| &self.rooms[slot])
    }

    /// Number of rooms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether there are no rooms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Sum of unread counters across all rooms.
    #[must_use]
    pub fn total_unread(&self) -> u64 {
        self.rooms.iter().map(|r| u64::from(r.unread_count)).sum()
    }

    /// Whether the room list is being fetched.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn begin_loading(&mut self) {
        self.loading = true;
    }

    pub(crate) fn finish_loading(&mut self) {
        self.loading = false;
    }

    /// Replace the directory wholesale with a fetched room list.
    ///
    /// Later duplicates of an ID replace earlier ones in place.
    pub fn load(&mut self, rooms: Vec<ChatRoom>, active: Option<&str>) {
        self.rooms.clear();
        self.index.clear();
        self.loading = false;
        for room in rooms {
            self.upsert(room, active);
        }
    }

    /// Apply a `room-updated` or `new-room` push.
    ///
    /// Returns `true` if the room was not known before.
    pub fn apply_room_update(&mut self, room: ChatRoom, active: Option<&str>) -> bool {
        self.upsert(room, active)
    }

    /// Update preview and unread counter for a pushed message.
    ///
    /// # Errors
    ///
    /// - `ClientError::UnknownRoom` if the message's room is not in the
    ///   directory. Rooms are never created from messages.
    pub fn apply_incoming_message(
        &mut self,
        message: &ChatMessage,
        active: Option<&str>,
    ) -> Result<(), ClientError> {
        let room = self.get_mut(&message.room_id)?;
        room.last_message = Some(LastMessage::from(message));
        if active == Some(message.room_id.as_str()) {
            room.unread_count = 0;
        } else {
            room.unread_count = room.unread_count.saturating_add(1);
        }
        Ok(())
    }

    /// Update the preview after one of our own messages was confirmed.
    ///
    /// # Errors
    ///
    /// - `ClientError::UnknownRoom` if the room is not in the directory.
    pub fn record_sent(&mut self, message: &ChatMessage) -> Result<(), ClientError> {
        let room = self.get_mut(&message.room_id)?;
        room.last_message = Some(LastMessage::from(message));
        Ok(())
    }

    /// Zero the unread counter. Returns `false` if the room is unknown.
    pub fn mark_read(&mut self, room_id: &str) -> bool {
        match self.index.get(room_id) {
            Some(&slot) => {
                self.rooms[slot].unread_count = 0;
                true
            },
            None => false,
        }
    }

    /// Drop every room (logout).
    pub fn clear(&mut self) {
        self.rooms.clear();
        self.index.clear();
        self.loading = false;
    }

    fn upsert(&mut self, mut room: ChatRoom, active: Option<&str>) -> bool {
        if active == Some(room.id.as_str()) {
            room.unread_count = 0;
        }

        if let Some(&slot) = self.index.get(&room.id) {
            self.rooms[slot] = room;
            false
        } else {
            self.index.insert(room.id.clone(), self.rooms.len());
            self.rooms.push(room);
            true
        }
    }

    fn get_mut(&mut self, room_id: &str) -> Result<&mut ChatRoom, ClientError> {
        match self.index.get(room_id) {
            Some(&slot) => Ok(&mut self.rooms[slot]),
            None => Err(ClientError::UnknownRoom(room_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use parley_proto::{MessageState, UserIdentity};

    use super::*;

    fn room(id: &str, unread: u32) -> ChatRoom {
        ChatRoom { unread_count: unread, ..ChatRoom::new(id, id.to_uppercase()) }
    }

    fn message(room_id: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: format!("m-{text}"),
            text: text.into(),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            sender: UserIdentity::new("u2", "Bob"),
            room_id: room_id.into(),
            state: MessageState::Confirmed,
        }
    }

    #[test]
    fn load_replaces_wholesale() {
        let mut dir = RoomDirectory::new();
        dir.load(vec![room("r1", 0), room("r2", 0)], None);
        dir.load(vec![room("r3", 2)], None);

        assert_eq!(dir.len(), 1);
        assert!(dir.get("r1").is_none());
        assert_eq!(dir.total_unread(), 2);
    }

    #[test]
    fn load_zeroes_active_room() {
        let mut dir = RoomDirectory::new();
        dir.load(vec![room("r1", 3), room("r2", 1)], Some("r1"));

        assert_eq!(dir.get("r1").unwrap().unread_count, 0);
        assert_eq!(dir.get("r2").unwrap().unread_count, 1);
    }

    #[test]
    fn room_update_is_idempotent() {
        let mut dir = RoomDirectory::new();
        assert!(dir.apply_room_update(room("r9", 0), None));
        assert!(!dir.apply_room_update(room("r9", 0), None));

        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn room_update_replaces_in_place() {
        let mut dir = RoomDirectory::new();
        dir.load(vec![room("r1", 0), room("r2", 0)], None);

        let renamed = ChatRoom { name: "renamed".into(), ..room("r1", 4) };
        dir.apply_room_update(renamed, None);

        let names: Vec<_> = dir.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["renamed", "R2"]);
        assert_eq!(dir.get("r1").unwrap().unread_count, 4);
    }

    #[test]
    fn incoming_message_counts_unread_unless_active() {
        let mut dir = RoomDirectory::new();
        dir.load(vec![room("r1", 0), room("r2", 0)], Some("r1"));

        dir.apply_incoming_message(&message("r1", "a"), Some("r1")).unwrap();
        dir.apply_incoming_message(&message("r2", "b"), Some("r1")).unwrap();
        dir.apply_incoming_message(&message("r2", "c"), Some("r1")).unwrap();

        assert_eq!(dir.get("r1").unwrap().unread_count, 0);
        let r2 = dir.get("r2").unwrap();
        assert_eq!(r2.unread_count, 2);
        assert_eq!(r2.last_message.as_ref().unwrap().text, "c");
        assert_eq!(r2.last_message.as_ref().unwrap().sender_id, "u2");
    }

    #[test]
    fn incoming_message_never_creates_room() {
        let mut dir = RoomDirectory::new();
        let err = dir.apply_incoming_message(&message("ghost", "a"), None).unwrap_err();

        assert_eq!(err, ClientError::UnknownRoom("ghost".into()));
        assert!(dir.is_empty());
    }

    #[test]
    fn record_sent_updates_preview_only() {
        let mut dir = RoomDirectory::new();
        dir.load(vec![room("r1", 1)], None);

        dir.record_sent(&message("r1", "mine")).unwrap();

        let r1 = dir.get("r1").unwrap();
        assert_eq!(r1.unread_count, 1);
        assert_eq!(r1.last_message.as_ref().unwrap().text, "mine");
    }

    #[test]
    fn mark_read_and_clear() {
        let mut dir = RoomDirectory::new();
        dir.load(vec![room("r1", 3)], None);

        assert!(dir.mark_read("r1"));
        assert!(!dir.mark_read("r2"));
        assert_eq!(dir.total_unread(), 0);

        dir.begin_loading();
        dir.clear();
        assert!(dir.is_empty());
        assert!(!dir.is_loading());
    }
}
