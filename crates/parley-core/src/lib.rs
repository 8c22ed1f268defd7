//! Parley Core
//!
//! Protocol-independent building blocks shared by the client state machine
//! and the runtime: the [`env::Environment`] abstraction over time, and the
//! [`connection::Connection`] lifecycle state machine.
//!
//! Both follow the action pattern: methods take time as input and return
//! actions for the caller to execute, with no I/O of their own.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod env;
pub mod error;

pub use connection::{Connection, ConnectionAction, ConnectionConfig, ConnectionState};
pub use env::{Environment, SystemEnv};
pub use error::ConnectionError;
