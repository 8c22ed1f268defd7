//! CLI errors.

use std::io;

use parley_app::AppError;
use parley_client::transport::TransportError;
use thiserror::Error;

/// Errors surfaced by the line client.
#[derive(Debug, Error)]
pub enum CliError {
    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Socket transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The socket task is gone.
    #[error("connection channel closed")]
    ChannelClosed,

    /// A chat operation failed.
    #[error(transparent)]
    App(#[from] AppError),
}
