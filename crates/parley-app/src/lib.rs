//! Application layer for Parley
//!
//! Generic runtime that owns the chat client and the transport, and the
//! service handle the rest of the application talks to. The same
//! orchestration code runs in production and in deterministic simulation.
//!
//! # Components
//!
//! - [`Bridge`]: Protocol bridge (feeds the client, collects its effects)
//! - [`Driver`]: Trait for platform-specific transport I/O
//! - [`Runtime`]: Single task that owns all chat state
//! - [`ChatHandle`]: Cloneable service object used by views and commands
//! - [`ChatSnapshot`]: Read-only view published after every change

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod bridge;
mod config;
mod driver;
mod error;
mod event;
mod handle;
mod runtime;
mod state;

pub use action::AppAction;
pub use bridge::{Bridge, TransportIntent};
pub use config::RuntimeConfig;
pub use driver::Driver;
pub use error::AppError;
pub use event::AppEvent;
pub use handle::ChatHandle;
pub use runtime::Runtime;
pub use state::ChatSnapshot;
