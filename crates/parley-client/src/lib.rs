//! Client
//!
//! Action-based chat synchronization state machine. Maintains the live room
//! list, the active room's message timeline, optimistic sends, unread
//! bookkeeping and the connection lifecycle.
//!
//! # Architecture
//!
//! The client follows the Sans-IO and action-based patterns of
//! [`parley_core`]. It receives events ([`ClientEvent`]), processes them
//! through pure state machine logic, and returns actions ([`ClientAction`])
//! for the caller to execute. Stale results (history for a room that is no
//! longer active, acknowledgements from a previous connection) are recognised
//! by comparison when they arrive and dropped.
//!
//! # Components
//!
//! - [`Client`]: Top-level state machine
//! - [`RoomDirectory`]: Ordered room list with previews and unread counters
//! - [`Timeline`]: Message log of the active room
//! - [`ClientEvent`]: Events fed into the client
//! - [`ClientAction`]: Actions produced by the client
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedClient`]: Socket session over WebSocket
//! - [`transport::connect`]: Open a session for a user

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod config;
mod directory;
mod error;
mod event;
mod requests;
mod timeline;

#[cfg(feature = "transport")]
pub mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use directory::RoomDirectory;
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent};
pub use parley_core::env::Environment;
pub use parley_proto::{ChatMessage, ChatRoom, MessageId, MessageState, RoomId, UserIdentity};
pub use timeline::{ReceiveOutcome, Timeline};
