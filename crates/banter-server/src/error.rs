//! Server error types.
//!
//! Only startup and socket-level failures surface here. Per-connection read
//! and write errors are disconnect signals, not errors: they end one
//! session and the server keeps running.

use thiserror::Error;

/// Errors that abort startup or surface from the listening socket.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid configuration, e.g. an unparseable bind address.
    #[error("configuration error: {0}")]
    Config(String),

    /// Socket-level failure (bind, listen, accept, local address lookup).
    #[error("transport error: {0}")]
    Transport(String),
}
