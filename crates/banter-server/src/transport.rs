//! TCP listener setup.
//!
//! Thin wrapper over [`tokio::net::TcpListener`] that maps socket errors
//! into [`ServerError`] with context. Bind failures abort startup;
//! accept failures are reported to the caller, which logs and keeps
//! accepting.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use crate::error::ServerError;

/// Listening socket for the chat service.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Bind to `addr` (e.g. `"0.0.0.0:12345"`).
    ///
    /// # Errors
    ///
    /// - [`ServerError::Config`] if the address does not parse.
    /// - [`ServerError::Transport`] if binding fails (port in use,
    ///   permission denied).
    pub async fn bind(addr: &str) -> Result<Self, ServerError> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address {addr:?}: {e}")))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Transport(format!("failed to bind {addr}: {e}")))?;

        Ok(Self { listener })
    }

    /// Accept the next inbound connection.
    ///
    /// # Errors
    ///
    /// [`ServerError::Transport`] if the accept call fails.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ServerError> {
        self.listener
            .accept()
            .await
            .map_err(|e| ServerError::Transport(format!("accept failed: {e}")))
    }

    /// Local address actually bound. Resolves the real port when bound to
    /// port 0.
    ///
    /// # Errors
    ///
    /// [`ServerError::Transport`] if the socket address lookup fails.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::Transport(format!("local address lookup failed: {e}")))
    }
}
