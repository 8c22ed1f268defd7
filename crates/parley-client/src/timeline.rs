//! Message timeline of the active room.
//!
//! Messages are stored oldest-first so that new messages append without
//! shifting existing slots, which keeps the ID → slot index stable. Readers
//! see the timeline newest-first through [`Timeline::iter`].
//!
//! # Ordering
//!
//! History is ordered newest-first by `createdAt`, ties broken by message ID
//! ascending. Messages arriving afterwards (pushes and optimistic sends) are
//! placed at the newest end in arrival order.

use std::collections::{HashMap, HashSet};

use parley_proto::{ChatMessage, MessageId, MessageState, RoomId};

/// Result of [`Timeline::receive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// New message placed at the newest end.
    Inserted,
    /// A message with this ID is already present.
    Duplicate,
    /// The push is the echo of one of our own unconfirmed messages, which was
    /// replaced in place.
    Adopted {
        /// Temporary ID the message had before adoption.
        temp_id: MessageId,
    },
}

/// Ordered message log for one room.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    room_id: Option<RoomId>,
    /// Oldest first.
    slots: Vec<ChatMessage>,
    /// Message ID → position in `slots`.
    index: HashMap<MessageId, usize>,
    loading: bool,
}

impl Timeline {
    /// Create an empty timeline with no room.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Room this timeline shows.
    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    /// Whether a history fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the timeline has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Messages newest-first.
    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.slots.iter().rev()
    }

    /// Message by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ChatMessage> {
        self.index.get(id).map(|&slot| &self.slots[slot])
    }

    /// Newest message, if any.
    #[must_use]
    pub fn newest(&self) -> Option<&ChatMessage> {
        self.slots.last()
    }

    /// Clear all messages and switch to `room_id`.
    pub fn reset(&mut self, room_id: Option<RoomId>) {
        self.room_id = room_id;
        self.slots.clear();
        self.index.clear();
        self.loading = false;
    }

    pub(crate) fn begin_loading(&mut self) {
        self.loading = true;
    }

    pub(crate) fn finish_loading(&mut self) {
        self.loading = false;
    }

    /// Replace the timeline with fetched history.
    ///
    /// Local messages the history does not contain survive at the newest end
    /// if they are unconfirmed or newer than everything in the history.
    pub fn load_history(&mut self, mut history: Vec<ChatMessage>) {
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let mut seen = HashSet::new();
        history.retain(|m| seen.insert(m.id.clone()));

        let newest_fetched = history.first().map(|m| m.created_at);
        let extras: Vec<ChatMessage> = std::mem::take(&mut self.slots)
            .into_iter()
            .filter(|m| !seen.contains(&m.id))
            .filter(|m| m.is_unconfirmed() || newest_fetched.is_none_or(|t| m.created_at > t))
            .collect();

        history.reverse();
        history.extend(extras);
        self.slots = history;
        self.loading = false;
        self.rebuild_index();
    }

    /// Add an optimistic message at the newest end.
    pub fn push_local(&mut self, message: ChatMessage) {
        self.push(message);
    }

    /// Apply a pushed message.
    ///
    /// `own_id` is the local user; an unconfirmed message of ours with the
    /// same text is adopted instead of inserting a second copy.
    pub fn receive(&mut self, message: ChatMessage, own_id: Option<&str>) -> ReceiveOutcome {
        if self.index.contains_key(&message.id) {
            return ReceiveOutcome::Duplicate;
        }

        let adoptable = own_id.filter(|own| *own == message.sender.id).and_then(|own| {
            self.slots.iter().position(|m| {
                m.is_unconfirmed() && m.sender.id == own && m.text == message.text
            })
        });

        match adoptable {
            Some(slot) => {
                let temp_id = self.slots[slot].id.clone();
                self.index.remove(&temp_id);
                self.index.insert(message.id.clone(), slot);
                self.slots[slot] = ChatMessage { state: MessageState::Confirmed, ..message };
                ReceiveOutcome::Adopted { temp_id }
            },
            None => {
                self.push(message);
                ReceiveOutcome::Inserted
            },
        }
    }

    /// Confirm the message with `temp_id` in place.
    ///
    /// Returns `true` if the confirmed message is present afterwards, either
    /// through this call or because an echo already delivered it.
    ///
    /// If the temporary slot was taken over by a same-text message from
    /// another session, the confirmed message is appended at the newest end.
    pub fn confirm(&mut self, temp_id: &str, confirmed: &ChatMessage) -> bool {
        let Some(&slot) = self.index.get(temp_id) else {
            if self.index.contains_key(&confirmed.id) {
                return true;
            }
            if self.room_id.as_deref() != Some(confirmed.room_id.as_str()) {
                return false;
            }
            self.push(ChatMessage { state: MessageState::Confirmed, ..confirmed.clone() });
            return true;
        };

        if confirmed.id != temp_id && self.index.contains_key(&confirmed.id) {
            self.slots.remove(slot);
            self.rebuild_index();
            return true;
        }

        let entry = &mut self.slots[slot];
        entry.id.clone_from(&confirmed.id);
        entry.text.clone_from(&confirmed.text);
        entry.created_at = confirmed.created_at;
        entry.state = MessageState::Confirmed;
        if !confirmed.room_id.is_empty() {
            entry.room_id.clone_from(&confirmed.room_id);
        }

        self.index.remove(temp_id);
        self.index.insert(confirmed.id.clone(), slot);
        true
    }

    /// Mark a pending message failed. Returns `false` if there is no pending
    /// message with this ID.
    pub fn mark_failed(&mut self, id: &str) -> bool {
        self.transition(id, MessageState::Pending, MessageState::Failed)
    }

    /// Move a failed message back to pending for a retry.
    pub fn set_pending(&mut self, id: &str) -> bool {
        self.transition(id, MessageState::Failed, MessageState::Pending)
    }

    fn transition(&mut self, id: &str, from: MessageState, to: MessageState) -> bool {
        match self.index.get(id) {
            Some(&slot) if self.slots[slot].state == from => {
                self.slots[slot].state = to;
                true
            },
            _ => false,
        }
    }

    fn push(&mut self, message: ChatMessage) {
        self.index.insert(message.id.clone(), self.slots.len());
        self.slots.push(message);
    }

    fn rebuild_index(&mut self) {
        self.index = self.slots.iter().enumerate().map(|(slot, m)| (m.id.clone(), slot)).collect();
    }
}
