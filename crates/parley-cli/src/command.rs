//! Line command parsing.
//!
//! A line starting with `/` is a command; anything else is message text for
//! the open room.

use parley_proto::{MessageId, RoomId, UserId};
use thiserror::Error;

/// Parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send text to the open room.
    Say(String),
    /// List rooms.
    Rooms,
    /// Open a room.
    Open(RoomId),
    /// Close the open room.
    Close,
    /// Show the open room's timeline.
    History,
    /// Create a room with the given participants.
    Create {
        /// Other participants.
        participant_ids: Vec<UserId>,
        /// Optional room name.
        name: Option<String>,
    },
    /// Resend a failed message.
    Retry(MessageId),
    /// Mark a room read.
    Read(RoomId),
    /// Log out and log back in.
    Reconnect,
    /// Print usage.
    Help,
    /// Exit.
    Quit,
}

/// Input that is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Empty line.
    #[error("nothing to do")]
    Empty,

    /// Unknown `/command`.
    #[error("unknown command /{0}, try /help")]
    Unknown(String),

    /// Command without its required argument.
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Usage text printed by `/help`.
pub const HELP: &str = "\
/rooms                     list rooms
/open <room>               open a room
/close                     close the open room
/history                   show the open room
/create <a,b,...> [name]   create a room with the given users
/retry <message>           resend a failed message
/read <room>               mark a room read
/reconnect                 reopen the connection
/quit                      exit
<text>                     send to the open room";

impl std::str::FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Self::Say(line.to_string()));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        match name {
            "rooms" => Ok(Self::Rooms),
            "open" => one_arg(args, "/open <room>").map(Self::Open),
            "close" => Ok(Self::Close),
            "history" => Ok(Self::History),
            "create" => parse_create(args),
            "retry" => one_arg(args, "/retry <message>").map(Self::Retry),
            "read" => one_arg(args, "/read <room>").map(Self::Read),
            "reconnect" => Ok(Self::Reconnect),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

fn one_arg(args: &str, usage: &'static str) -> Result<String, ParseError> {
    match args.split_whitespace().next() {
        Some(arg) => Ok(arg.to_string()),
        None => Err(ParseError::Usage(usage)),
    }
}

fn parse_create(args: &str) -> Result<Command, ParseError> {
    const USAGE: &str = "/create <a,b,...> [name]";

    let (users, name) = match args.split_once(char::is_whitespace) {
        Some((users, name)) => (users, Some(name.trim().to_string())),
        None => (args, None),
    };

    let participant_ids: Vec<UserId> = users
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    if participant_ids.is_empty() {
        return Err(ParseError::Usage(USAGE));
    }

    Ok(Command::Create { participant_ids, name: name.filter(|n| !n.is_empty()) })
}
