//! Plain-text rendering of chat state.

use std::fmt::Write as _;

use parley_app::{AppEvent, ChatSnapshot};
use parley_proto::{ChatMessage, ChatRoom, MessageState};

/// One line per room: ID, name, unread badge and last message preview.
pub fn room_list(snapshot: &ChatSnapshot) -> String {
    if snapshot.rooms_loading && snapshot.rooms.is_empty() {
        return "loading rooms...".to_string();
    }
    if snapshot.rooms.is_empty() {
        return "no rooms".to_string();
    }

    let mut out = String::new();
    for room in &snapshot.rooms {
        let marker = if snapshot.active_room.as_deref() == Some(room.id.as_str()) { '*' } else { ' ' };
        let _ = writeln!(out, "{marker} {}", room_line(room));
    }
    out.trim_end().to_string()
}

/// Single room summary.
pub fn room_line(room: &ChatRoom) -> String {
    let name = if room.name.is_empty() { room.participant_ids.join(", ") } else { room.name.clone() };
    let mut line = format!("{} {}", room.id, name);
    if room.unread_count > 0 {
        let _ = write!(line, " [{}]", room.unread_count);
    }
    if let Some(last) = &room.last_message {
        let _ = write!(line, " - {}: {}", last.sender_id, last.text);
    }
    line
}

/// Timeline of the open room, oldest first.
pub fn history(snapshot: &ChatSnapshot) -> String {
    let Some(room_id) = &snapshot.active_room else {
        return "no room open".to_string();
    };
    if snapshot.messages_loading && snapshot.messages.is_empty() {
        return format!("loading {room_id}...");
    }
    if snapshot.messages.is_empty() {
        return format!("{room_id} has no messages");
    }

    snapshot.messages.iter().rev().map(message_line).collect::<Vec<_>>().join("\n")
}

/// Single message: time, author, text and delivery state.
pub fn message_line(message: &ChatMessage) -> String {
    let time = message.created_at.format("%H:%M");
    let suffix = match message.state {
        MessageState::Pending => " (sending)",
        MessageState::Failed => " (failed, /retry to resend)",
        MessageState::Confirmed | MessageState::System => "",
    };
    if message.state == MessageState::System {
        return format!("[{time}] * {}", message.text);
    }
    format!("[{time}] {}: {}{suffix}", message.sender.display_name, message.text)
}

/// Status line for a runtime notification, if it is worth showing.
pub fn event_line(event: &AppEvent) -> Option<String> {
    match event {
        AppEvent::Connected => Some("connected".to_string()),
        AppEvent::Disconnected { reason } => Some(format!("disconnected: {reason}")),
        AppEvent::MessageFailed { message_id, reason } => {
            Some(format!("message {message_id} failed: {reason}"))
        },
        AppEvent::RoomCreated { result: Err(reason), .. } => {
            Some(format!("room creation failed: {reason}"))
        },
        AppEvent::MessagePending { .. }
        | AppEvent::MessageConfirmed { .. }
        | AppEvent::RoomCreated { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use parley_proto::{LastMessage, UserIdentity};

    use super::*;

    fn message(id: &str, text: &str, state: MessageState) -> ChatMessage {
        ChatMessage {
            id: id.into(),
            text: text.into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            sender: UserIdentity::new("bob", "Bob"),
            room_id: "r1".into(),
            state,
        }
    }

    #[test]
    fn room_list_marks_active_room_and_unread() {
        let mut general = ChatRoom::new("r1", "general");
        general.last_message = Some(LastMessage::from(&message("m1", "hi", MessageState::Confirmed)));
        let mut direct = ChatRoom::new("r2", "");
        direct.participant_ids = vec!["alice".into(), "bob".into()];
        direct.unread_count = 3;

        let snapshot = ChatSnapshot {
            rooms: vec![general, direct],
            active_room: Some("r1".into()),
            ..ChatSnapshot::default()
        };

        insta::assert_snapshot!(room_list(&snapshot), @r"
        * r1 general - bob: hi
          r2 alice, bob [3]
        ");
    }

    #[test]
    fn history_is_oldest_first_with_states() {
        let snapshot = ChatSnapshot {
            active_room: Some("r1".into()),
            messages: vec![
                message("local-1", "still going", MessageState::Failed),
                message("m2", "second", MessageState::Pending),
                message("m1", "first", MessageState::Confirmed),
            ],
            ..ChatSnapshot::default()
        };

        insta::assert_snapshot!(history(&snapshot), @r"
        [09:30] Bob: first
        [09:30] Bob: second (sending)
        [09:30] Bob: still going (failed, /retry to resend)
        ");
    }

    #[test]
    fn empty_states_have_placeholders() {
        let snapshot = ChatSnapshot::default();
        assert_eq!(room_list(&snapshot), "no rooms");
        assert_eq!(history(&snapshot), "no room open");
    }

    #[test]
    fn quiet_events_are_not_shown() {
        let confirmed =
            AppEvent::MessageConfirmed { message_id: "local-1".into(), confirmed_id: "m1".into() };
        assert_eq!(event_line(&confirmed), None);

        let failed = AppEvent::RoomCreated { ticket: 1, result: Err("limit".into()) };
        assert_eq!(event_line(&failed).as_deref(), Some("room creation failed: limit"));
    }
}
