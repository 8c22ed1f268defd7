//! Service handle.
//!
//! [`ChatHandle`] is the explicit service object passed to whoever needs chat
//! operations. Every call is forwarded to the [`crate::Runtime`] task, which
//! is the only owner of the chat state.

use parley_proto::{MessageId, RoomId, UserId, UserIdentity};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::{AppAction, AppError, AppEvent, ChatSnapshot, action::Reply};

/// Cloneable handle to a running chat runtime.
#[derive(Clone)]
pub struct ChatHandle {
    commands: mpsc::Sender<AppAction>,
    snapshot: watch::Receiver<ChatSnapshot>,
    events: broadcast::Sender<AppEvent>,
}

impl ChatHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<AppAction>,
        snapshot: watch::Receiver<ChatSnapshot>,
        events: broadcast::Sender<AppEvent>,
    ) -> Self {
        Self { commands, snapshot, events }
    }

    /// Open a session for `identity`.
    ///
    /// Resolves once the transport is open.
    ///
    /// # Errors
    ///
    /// - `AppError::Client` if a session is already open or opening
    /// - `AppError::Transport` if the transport could not be opened
    pub async fn connect(&self, identity: UserIdentity) -> Result<(), AppError> {
        self.request(|reply| AppAction::Connect { identity, reply }).await
    }

    /// Logout. Safe to call when not connected.
    ///
    /// # Errors
    ///
    /// - `AppError::Shutdown` if the runtime has stopped
    pub async fn disconnect(&self) -> Result<(), AppError> {
        self.request(|reply| AppAction::Disconnect { reply }).await
    }

    /// Select a room, or close the open one with `None`.
    ///
    /// # Errors
    ///
    /// - `AppError::Shutdown` if the runtime has stopped
    pub async fn set_active_room(&self, room_id: Option<RoomId>) -> Result<(), AppError> {
        self.request(|reply| AppAction::SetActiveRoom { room_id, reply }).await
    }

    /// Send a message to the active room. Returns the temporary message ID.
    ///
    /// # Errors
    ///
    /// - `AppError::Client` if there is no active room, the text is empty, or
    ///   the session is not connected
    pub async fn send_message(&self, text: impl Into<String>) -> Result<MessageId, AppError> {
        let text = text.into();
        self.request(|reply| AppAction::SendMessage { text, reply }).await
    }

    /// Re-send a failed message.
    ///
    /// # Errors
    ///
    /// - `AppError::Client` if the message is unknown or has not failed
    pub async fn retry_message(&self, message_id: impl Into<MessageId>) -> Result<(), AppError> {
        let message_id = message_id.into();
        self.request(|reply| AppAction::RetryMessage { message_id, reply }).await
    }

    /// Mark a room as read. Fire-and-forget.
    pub async fn mark_room_read(&self, room_id: impl Into<RoomId>) {
        let room_id = room_id.into();
        if self.commands.send(AppAction::MarkRoomRead { room_id }).await.is_err() {
            tracing::debug!("mark-read dropped, runtime stopped");
        }
    }

    /// Create a room with `participant_ids` (the own ID is added).
    ///
    /// Resolves with the new room ID once the server answers. The room shows
    /// up in the directory when the server pushes it.
    ///
    /// # Errors
    ///
    /// - `AppError::Client` when not connected
    /// - `AppError::Rejected` with the server error, "connection closed" or
    ///   "request timed out"
    pub async fn create_room(
        &self,
        participant_ids: Vec<UserId>,
        name: Option<String>,
    ) -> Result<RoomId, AppError> {
        self.request(|reply| AppAction::CreateRoom { participant_ids, name, reply }).await
    }

    /// Latest published state.
    #[must_use]
    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that is notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshot.clone()
    }

    /// Receiver for runtime notifications.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> AppAction,
    ) -> Result<T, AppError> {
        let (reply, response) = oneshot::channel();
        self.commands.send(make(reply)).await.map_err(|_| AppError::Shutdown)?;
        response.await.map_err(|_| AppError::Shutdown)?
    }
}
