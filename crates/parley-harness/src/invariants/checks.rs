//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::{HashMap, HashSet};

use parley_proto::MessageState;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// The room a user is looking at never shows unread messages.
pub struct ActiveRoomUnreadZero;

impl Invariant for ActiveRoomUnreadZero {
    fn name(&self) -> &'static str {
        "active_room_unread_zero"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let Some(active) = &client.active_room else {
                continue;
            };
            if let Some(room) = client.rooms.iter().find(|r| &r.id == active)
                && room.unread_count != 0
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "client {}: active room {} shows {} unread",
                        client.id, active, room.unread_count
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Each room appears at most once in a directory.
pub struct UniqueRoomIds;

impl Invariant for UniqueRoomIds {
    fn name(&self) -> &'static str {
        "unique_room_ids"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let mut seen = HashSet::new();
            for room in &client.rooms {
                if !seen.insert(room.id.as_str()) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("client {}: room {} listed twice", client.id, room.id),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Each message appears at most once in a timeline.
pub struct UniqueMessageIds;

impl Invariant for UniqueMessageIds {
    fn name(&self) -> &'static str {
        "unique_message_ids"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let mut seen = HashSet::new();
            for message in &client.messages {
                if !seen.insert(message.id.as_str()) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "client {}: message {} shown twice",
                            client.id, message.id
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// The timeline only holds messages of the active room, and is empty when no
/// room is active.
pub struct TimelineInActiveRoom;

impl Invariant for TimelineInActiveRoom {
    fn name(&self) -> &'static str {
        "timeline_in_active_room"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            match &client.active_room {
                None if !client.messages.is_empty() => {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "client {}: {} messages shown without an active room",
                            client.id,
                            client.messages.len()
                        ),
                    });
                },
                Some(active) => {
                    if let Some(stray) = client.messages.iter().find(|m| &m.room_id != active) {
                        return Err(Violation {
                            invariant: self.name(),
                            message: format!(
                                "client {}: message {} of room {} shown in {}",
                                client.id, stray.id, stray.room_id, active
                            ),
                        });
                    }
                },
                None => {},
            }
        }
        Ok(())
    }
}

/// Clients that both hold a confirmed message agree on its content.
pub struct MessageAgreement;

impl Invariant for MessageAgreement {
    fn name(&self) -> &'static str {
        "message_agreement"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let mut first_seen: HashMap<&str, (&str, &str)> = HashMap::new();

        for client in &state.clients {
            for message in &client.messages {
                if message.state != MessageState::Confirmed {
                    continue;
                }
                match first_seen.get(message.id.as_str()) {
                    Some((owner, text)) if *text != message.text => {
                        return Err(Violation {
                            invariant: self.name(),
                            message: format!(
                                "message {}: client {} sees {:?}, client {} sees {:?}",
                                message.id, owner, text, client.id, message.text
                            ),
                        });
                    },
                    Some(_) => {},
                    None => {
                        first_seen.insert(&message.id, (&client.id, &message.text));
                    },
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use parley_proto::{ChatMessage, ChatRoom, UserIdentity};

    use super::*;
    use crate::ClientSnapshot;

    fn message(id: &str, room_id: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: id.into(),
            text: text.into(),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            sender: UserIdentity::new("alice", "Alice"),
            room_id: room_id.into(),
            state: MessageState::Confirmed,
        }
    }

    fn unread_room(id: &str, unread: u32) -> ChatRoom {
        ChatRoom { unread_count: unread, ..ChatRoom::new(id, "room") }
    }

    #[test]
    fn active_room_with_unread_violates() {
        let client = ClientSnapshot::new("alice")
            .with_active_room(Some("r1"))
            .with_room(unread_room("r1", 2));

        let result = ActiveRoomUnreadZero.check(&SystemSnapshot::single(client));

        assert!(result.is_err());
    }

    #[test]
    fn inactive_room_may_have_unread() {
        let client = ClientSnapshot::new("alice")
            .with_active_room(Some("r1"))
            .with_room(unread_room("r1", 0))
            .with_room(unread_room("r2", 5));

        assert!(ActiveRoomUnreadZero.check(&SystemSnapshot::single(client)).is_ok());
    }

    #[test]
    fn duplicate_room_violates() {
        let client = ClientSnapshot::new("alice")
            .with_room(unread_room("r1", 0))
            .with_room(unread_room("r1", 0));

        assert!(UniqueRoomIds.check(&SystemSnapshot::single(client)).is_err());
    }

    #[test]
    fn duplicate_message_violates() {
        let client = ClientSnapshot::new("alice")
            .with_active_room(Some("r1"))
            .with_message(message("m1", "r1", "hi"))
            .with_message(message("m1", "r1", "hi"));

        assert!(UniqueMessageIds.check(&SystemSnapshot::single(client)).is_err());
    }

    #[test]
    fn foreign_message_in_timeline_violates() {
        let client = ClientSnapshot::new("alice")
            .with_active_room(Some("r1"))
            .with_message(message("m1", "r2", "hi"));

        assert!(TimelineInActiveRoom.check(&SystemSnapshot::single(client)).is_err());
    }

    #[test]
    fn timeline_without_active_room_violates() {
        let client = ClientSnapshot::new("alice").with_message(message("m1", "r1", "hi"));

        assert!(TimelineInActiveRoom.check(&SystemSnapshot::single(client)).is_err());
    }

    #[test]
    fn diverging_text_violates_agreement() {
        let alice = ClientSnapshot::new("alice").with_message(message("m1", "r1", "hi"));
        let bob = ClientSnapshot::new("bob").with_message(message("m1", "r1", "bye"));

        let result = MessageAgreement.check(&SystemSnapshot::from_clients(vec![alice, bob]));

        assert!(result.is_err());
    }

    #[test]
    fn pending_copies_are_not_compared() {
        let alice = ClientSnapshot::new("alice").with_message(message("m1", "r1", "hi"));
        let mut pending = message("m1", "r1", "draft");
        pending.state = MessageState::Pending;
        let bob = ClientSnapshot::new("bob").with_message(pending);

        assert!(MessageAgreement.check(&SystemSnapshot::from_clients(vec![alice, bob])).is_ok());
    }
}
