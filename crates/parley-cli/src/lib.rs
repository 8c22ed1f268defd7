//! Line-oriented chat client for Parley.
//!
//! A thin shell over [`parley_app::Driver`] that provides a WebSocket
//! transport and a stdin/stdout front end. All orchestration logic lives in
//! the generic [`parley_app::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
pub mod driver;
pub mod error;
pub mod render;
pub mod repl;

pub use command::{Command, ParseError};
pub use driver::WsDriver;
pub use error::CliError;
pub use repl::Repl;
