//! Generic runtime for chat orchestration.
//!
//! The Runtime is the single task that owns the chat state. It coordinates:
//! - [`ChatHandle`] commands arriving over a channel
//! - [`Bridge`]: Protocol bridge to the client state machine
//! - [`Driver`]: Platform-specific transport I/O
//!
//! After every step the runtime publishes a fresh [`ChatSnapshot`].

use std::collections::HashMap;

use parley_client::{ClientEvent, Environment};
use parley_proto::RoomId;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::{
    AppAction, AppError, AppEvent, Bridge, ChatHandle, ChatSnapshot, Driver, RuntimeConfig,
    TransportIntent,
};

/// Generic runtime that orchestrates handles, Bridge and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific transport driver
/// - `E`: Environment providing time
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    bridge: Bridge<E>,
    config: RuntimeConfig,
    commands: mpsc::Receiver<AppAction>,
    snapshot: watch::Sender<ChatSnapshot>,
    events: broadcast::Sender<AppEvent>,

    /// Room creations awaiting the server, by ticket.
    pending_creates: HashMap<u64, oneshot::Sender<Result<RoomId, AppError>>>,
    next_ticket: u64,
}

impl<D, E> Runtime<D, E>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
{
    /// Create a runtime and the handle that controls it.
    pub fn new(driver: D, env: E, config: RuntimeConfig) -> (Self, ChatHandle) {
        let (command_tx, commands) = mpsc::channel(config.command_capacity);
        let (snapshot, snapshot_rx) = watch::channel(ChatSnapshot::default());
        let (events, _) = broadcast::channel(config.event_capacity);

        let handle = ChatHandle::new(command_tx, snapshot_rx, events.clone());
        let runtime = Self {
            driver,
            bridge: Bridge::new(env, config.client.clone()),
            config,
            commands,
            snapshot,
            events,
            pending_creates: HashMap::new(),
            next_ticket: 1,
        };

        (runtime, handle)
    }

    /// Run the event loop until every [`ChatHandle`] is dropped.
    ///
    /// Each cycle waits for whichever comes first:
    /// 1. A command from a handle
    /// 2. An envelope from the server (only while connected)
    /// 3. The periodic tick that expires timeouts
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    self.process_command(command).await;
                },
                envelope = self.driver.recv_envelope(), if self.driver.is_connected() => {
                    match envelope {
                        Some(envelope) => {
                            let events = self.bridge.handle_envelope(envelope);
                            self.dispatch(events);
                        },
                        None => {
                            tracing::info!("server closed the connection");
                            self.driver.stop();
                            let events = self.bridge.transport_closed("connection closed");
                            self.dispatch(events);
                        },
                    }
                },
                _ = ticker.tick() => {
                    let now = self.driver.now();
                    let events = self.bridge.handle_tick(now);
                    self.dispatch(events);
                },
            }

            self.flush().await;
            self.publish();
        }

        tracing::debug!("all handles dropped, shutting down");
        if let Ok(events) = self.bridge.handle(ClientEvent::Disconnect) {
            self.dispatch(events);
        }
        self.flush().await;
        self.publish();
    }

    async fn process_command(&mut self, command: AppAction) {
        match command {
            AppAction::Connect { identity, reply } => {
                match self.bridge.handle(ClientEvent::Connect { identity }) {
                    Ok(events) => {
                        self.dispatch(events);
                        let result = self.apply_transport().await;
                        let _ = reply.send(result);
                    },
                    Err(e) => {
                        let _ = reply.send(Err(e.into()));
                    },
                }
            },
            AppAction::Disconnect { reply } => {
                let result = self.bridge.handle(ClientEvent::Disconnect);
                let result = result.map(|events| self.dispatch(events)).map_err(AppError::from);
                let _ = reply.send(result);
            },
            AppAction::SetActiveRoom { room_id, reply } => {
                let result = self.bridge.handle(ClientEvent::SetActiveRoom { room_id });
                let result = result.map(|events| self.dispatch(events)).map_err(AppError::from);
                let _ = reply.send(result);
            },
            AppAction::SendMessage { text, reply } => {
                let result = match self.bridge.handle(ClientEvent::SendMessage { text }) {
                    Ok(events) => {
                        let message_id = events.iter().find_map(|e| match e {
                            AppEvent::MessagePending { message_id, .. } => Some(message_id.clone()),
                            _ => None,
                        });
                        self.dispatch(events);
                        message_id.ok_or_else(|| AppError::Rejected("message not queued".into()))
                    },
                    Err(e) => Err(e.into()),
                };
                let _ = reply.send(result);
            },
            AppAction::RetryMessage { message_id, reply } => {
                let result = self.bridge.handle(ClientEvent::RetryMessage { message_id });
                let result = result.map(|events| self.dispatch(events)).map_err(AppError::from);
                let _ = reply.send(result);
            },
            AppAction::MarkRoomRead { room_id } => {
                match self.bridge.handle(ClientEvent::MarkRoomRead { room_id }) {
                    Ok(events) => self.dispatch(events),
                    Err(e) => tracing::debug!(error = %e, "mark-read failed"),
                }
            },
            AppAction::CreateRoom { participant_ids, name, reply } => {
                let ticket = self.next_ticket;
                self.next_ticket += 1;

                match self.bridge.handle(ClientEvent::CreateRoom { ticket, participant_ids, name }) {
                    Ok(events) => {
                        self.pending_creates.insert(ticket, reply);
                        self.dispatch(events);
                    },
                    Err(e) => {
                        let _ = reply.send(Err(e.into()));
                    },
                }
            },
        }
    }

    /// Execute transport intents collected by the bridge.
    ///
    /// Returns the outcome of the last open attempt, if any.
    async fn apply_transport(&mut self) -> Result<(), AppError> {
        let mut result = Ok(());

        for intent in self.bridge.take_transport() {
            match intent {
                TransportIntent::Open { user_id } => match self.driver.connect(&user_id).await {
                    Ok(()) => {
                        let events = self.bridge.transport_opened();
                        self.dispatch(events);
                        result = Ok(());
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "transport failed to open");
                        let events = self.bridge.transport_closed(&e.to_string());
                        self.dispatch(events);
                        result = Err(AppError::Transport(e.to_string()));
                    },
                },
                TransportIntent::Close { reason } => {
                    tracing::debug!(%reason, "closing transport");
                    self.driver.stop();
                },
            }
        }

        result
    }

    /// Send queued envelopes and execute queued transport intents.
    ///
    /// A failed send is treated as the transport closing.
    async fn flush(&mut self) {
        if let Err(e) = self.apply_transport().await {
            tracing::debug!(error = %e, "transport intent failed");
        }

        for envelope in self.bridge.take_outgoing() {
            if !self.driver.is_connected() {
                tracing::debug!(event = %envelope.event, "dropping envelope, not connected");
                continue;
            }
            if let Err(e) = self.driver.send_envelope(envelope).await {
                tracing::warn!(error = %e, "send failed, closing transport");
                self.driver.stop();
                let events = self.bridge.transport_closed(&e.to_string());
                self.dispatch(events);
            }
        }
    }

    /// Resolve room-creation waiters and broadcast notifications.
    fn dispatch(&mut self, events: Vec<AppEvent>) {
        for event in events {
            if let AppEvent::RoomCreated { ticket, result } = &event
                && let Some(reply) = self.pending_creates.remove(ticket)
            {
                let _ = reply.send(result.clone().map_err(AppError::Rejected));
            }
            let _ = self.events.send(event);
        }
    }

    fn publish(&self) {
        let client = self.bridge.client();
        self.snapshot.send_if_modified(|current| {
            let next = ChatSnapshot::capture(client);
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
