//! Interactive line loop.
//!
//! Reads commands from stdin and prints state changes as they are published
//! by the runtime. New messages in the open room are printed once they are
//! confirmed; status changes come from the runtime's event stream.

use std::{
    collections::HashSet,
    io::{self, Write},
};

use parley_app::{AppError, ChatHandle, ChatSnapshot};
use parley_proto::{MessageState, UserIdentity};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};

use crate::{
    CliError,
    command::{Command, HELP, ParseError},
    render,
};

/// Line-oriented front end over a [`ChatHandle`].
pub struct Repl {
    handle: ChatHandle,
    identity: UserIdentity,
    /// Messages already printed for the open room.
    shown: HashSet<String>,
    shown_room: Option<String>,
}

impl Repl {
    /// Create a loop for `identity`.
    pub fn new(handle: ChatHandle, identity: UserIdentity) -> Self {
        Self { handle, identity, shown: HashSet::new(), shown_room: None }
    }

    /// Connect, then process input until `/quit` or end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if stdout cannot be written or the runtime stops.
    pub async fn run(mut self) -> Result<(), CliError> {
        let mut snapshots = self.handle.subscribe();
        let mut events = self.handle.events();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        if let Err(e) = self.handle.connect(self.identity.clone()).await {
            say(&format!("connect failed: {e} (use /reconnect)"))?;
        }
        say("type /help for commands")?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    match line.parse::<Command>() {
                        Ok(Command::Quit) => break,
                        Ok(command) => self.execute(command).await?,
                        Err(ParseError::Empty) => {},
                        Err(e) => say(&e.to_string())?,
                    }
                },
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        return Err(AppError::Shutdown.into());
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    self.print_new_messages(&snapshot)?;
                },
                event = events.recv() => match event {
                    Ok(event) => {
                        if let Some(line) = render::event_line(&event) {
                            say(&line)?;
                        }
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "event stream lagged");
                    },
                    Err(RecvError::Closed) => return Err(AppError::Shutdown.into()),
                },
            }
        }

        self.handle.disconnect().await?;
        Ok(())
    }

    async fn execute(&mut self, command: Command) -> Result<(), CliError> {
        let result = match command {
            Command::Say(text) => self.handle.send_message(text).await.map(drop),
            Command::Rooms => return say(&render::room_list(&self.handle.snapshot())),
            Command::Open(room_id) => self.handle.set_active_room(Some(room_id)).await,
            Command::Close => self.handle.set_active_room(None).await,
            Command::History => {
                let snapshot = self.handle.snapshot();
                self.mark_shown(&snapshot);
                return say(&render::history(&snapshot));
            },
            Command::Create { participant_ids, name } => {
                match self.handle.create_room(participant_ids, name).await {
                    Ok(room_id) => return say(&format!("created {room_id}")),
                    Err(e) => Err(e),
                }
            },
            Command::Retry(message_id) => self.handle.retry_message(message_id).await,
            Command::Read(room_id) => {
                self.handle.mark_room_read(room_id).await;
                Ok(())
            },
            Command::Reconnect => {
                let _ = self.handle.disconnect().await;
                self.handle.connect(self.identity.clone()).await
            },
            Command::Help => return say(HELP),
            Command::Quit => Ok(()),
        };

        match result {
            Ok(()) => Ok(()),
            Err(AppError::Shutdown) => Err(AppError::Shutdown.into()),
            Err(e) => say(&format!("error: {e}")),
        }
    }

    /// Print confirmed messages of the open room that were not shown yet.
    fn print_new_messages(&mut self, snapshot: &ChatSnapshot) -> Result<(), CliError> {
        if snapshot.active_room != self.shown_room {
            self.shown.clear();
            self.shown_room.clone_from(&snapshot.active_room);
            if let Some(room_id) = &snapshot.active_room {
                say(&format!("-- {room_id} --"))?;
            }
        }
        if snapshot.messages_loading {
            return Ok(());
        }

        for message in snapshot.messages.iter().rev() {
            if message.state == MessageState::Confirmed && self.shown.insert(message.id.clone()) {
                say(&render::message_line(message))?;
            }
        }
        Ok(())
    }

    fn mark_shown(&mut self, snapshot: &ChatSnapshot) {
        self.shown_room.clone_from(&snapshot.active_room);
        self.shown.extend(snapshot.messages.iter().map(|m| m.id.clone()));
    }
}

fn say(line: &str) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    writeln!(out, "{line}")?;
    Ok(())
}
