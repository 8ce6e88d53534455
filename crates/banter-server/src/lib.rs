//! Banter chat server.
//!
//! A multi-user text chat service over plain TCP: clients authenticate
//! against a credential file, then exchange broadcasts, direct messages,
//! and group messages, one newline-delimited command per line.
//!
//! # Architecture
//!
//! Dispatch is kept pure: [`Router`] turns one command line into a list of
//! [`Delivery`] values by consulting the two shared registries, and the
//! runtime in this module executes those deliveries afterwards. The
//! registries encapsulate their own locks; nothing in the crate performs
//! I/O while holding one.
//!
//! Each connection gets two tasks: a reader that drives the login
//! handshake and then the command loop, and a writer that drains the
//! connection's outbound queue onto the socket. Deliveries from any
//! sender are queued, never written inline, so a slow recipient cannot
//! stall the sender's worker or the registries.
//!
//! # Components
//!
//! - [`Router`]: pure dispatch (commands in, deliveries out)
//! - [`SessionRegistry`]: handle → username, one session per username
//! - [`GroupStore`]: group name → member set, empty groups deleted
//! - [`Handshake`]: per-connection login state machine
//! - [`CredentialStore`]: the `username:password` file, loaded at startup
//! - [`Server`]: accept loop and per-connection tasks

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod error;
mod groups;
mod handshake;
mod registry;
mod router;
mod transport;

use std::{collections::HashMap, path::PathBuf, sync::Arc};

pub use auth::CredentialStore;
use banter_proto::reply;
pub use error::ServerError;
pub use groups::{GroupError, GroupStore};
pub use handshake::{AuthOutcome, Handshake, HandshakeError, HandshakeState};
pub use registry::{RegistryError, SessionRegistry};
pub use router::{Delivery, Router};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::{RwLock, mpsc},
};
pub use transport::TcpTransport;

/// Shared state for all connections.
///
/// Maps each connection handle to the sending end of its outbound queue.
/// All text to a client goes through its single writer task, preserving
/// per-recipient ordering. The queue is unbounded: a slow recipient
/// buffers in memory rather than stalling senders (delivery is
/// best-effort, backpressure is out of scope).
struct SharedState {
    peers: RwLock<HashMap<u64, mpsc::UnboundedSender<String>>>,
}

/// Shared service handles every connection worker needs.
///
/// The registries share their state internally, so cloning this hands
/// every worker the same maps.
#[derive(Clone)]
struct Service {
    router: Router,
    sessions: SessionRegistry,
    groups: GroupStore,
    credentials: Arc<CredentialStore>,
}

/// Server configuration for the runtime.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `"0.0.0.0:12345"`).
    pub bind_address: String,
    /// Path to the `username:password` credential file.
    pub users_path: PathBuf,
    /// Maximum concurrent connections; connections beyond the cap are
    /// dropped at accept time.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:12345".to_string(),
            users_path: PathBuf::from("users.txt"),
            max_connections: 100,
        }
    }
}

/// The chat server: a bound listener plus the shared registries.
pub struct Server {
    transport: TcpTransport,
    service: Service,
    max_connections: usize,
}

impl Server {
    /// Load credentials, build the registries, and bind the listener.
    ///
    /// # Errors
    ///
    /// [`ServerError::Config`] or [`ServerError::Transport`] if the bind
    /// address is invalid or binding fails. A missing credential file is
    /// not an error; it is logged and leaves the store empty.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let credentials = Arc::new(CredentialStore::load(&config.users_path));
        let sessions = SessionRegistry::new();
        let groups = GroupStore::new();
        let router = Router::new(sessions.clone(), groups.clone());

        let transport = TcpTransport::bind(&config.bind_address).await?;

        Ok(Self {
            transport,
            service: Service { router, sessions, groups, credentials },
            max_connections: config.max_connections,
        })
    }

    /// Local address the server is bound to.
    ///
    /// # Errors
    ///
    /// [`ServerError::Transport`] if the socket address lookup fails.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }

    /// Run the accept loop, spawning one worker per connection.
    ///
    /// Runs until the process is stopped. Accept failures are logged and
    /// the loop continues; only the initial address lookup can return an
    /// error.
    ///
    /// # Errors
    ///
    /// [`ServerError::Transport`] if the bound address cannot be read
    /// back at startup.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.transport.local_addr()?);

        let shared = Arc::new(SharedState { peers: RwLock::new(HashMap::new()) });
        // Handles are allocated only here, monotonically; they are unique
        // for the life of the process and never reused.
        let mut next_handle: u64 = 0;

        loop {
            match self.transport.accept().await {
                Ok((stream, peer_addr)) => {
                    // Claiming the slot here keeps the cap check and the
                    // insert one atomic step; a worker only ever removes
                    // its own entry.
                    let mut peers = shared.peers.write().await;
                    if peers.len() >= self.max_connections {
                        drop(peers);
                        tracing::warn!(%peer_addr, "connection limit reached, dropping connection");
                        drop(stream);
                        continue;
                    }

                    let handle = next_handle;
                    next_handle += 1;

                    let (outbound, outbound_rx) = mpsc::unbounded_channel::<String>();
                    peers.insert(handle, outbound.clone());
                    drop(peers);

                    tracing::debug!(handle, %peer_addr, "accepted connection");

                    let service = self.service.clone();
                    let shared = Arc::clone(&shared);
                    tokio::spawn(handle_connection(
                        stream, handle, outbound, outbound_rx, service, shared,
                    ));
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }
}

/// Handle one connection from claimed slot to cleanup.
///
/// The accept loop has already placed the outbound sender in the peer
/// map. This worker splits the stream, spawns the writer task, runs the
/// session, and then performs cleanup exactly once for every exit path:
/// the outbound sender leaves the peer map, the session (if one was
/// registered) leaves the registry, and the username is purged from
/// every group.
async fn handle_connection(
    stream: TcpStream,
    handle: u64,
    outbound: mpsc::UnboundedSender<String>,
    outbound_rx: mpsc::UnboundedReceiver<String>,
    service: Service,
    shared: Arc<SharedState>,
) {
    let (read_half, write_half) = stream.into_split();
    tokio::spawn(write_outbound(write_half, outbound_rx));

    let session = run_session(read_half, handle, &outbound, &service, &shared).await;

    shared.peers.write().await.remove(&handle);
    // Dropping the last sender lets the writer drain its queue and close
    // the socket, so rejection texts still reach the peer.
    drop(outbound);

    if let Some(username) = service.sessions.unregister(handle) {
        service.groups.remove_user_everywhere(&username);
        tracing::info!(handle, username, "user disconnected");
    } else {
        tracing::debug!(handle, "connection closed before login");
    }

    if let Err(err) = session {
        // Unreachable with a correctly sequenced driver; a bug guard, not
        // a wire condition.
        tracing::error!(handle, %err, "handshake driven out of order");
    }
}

/// Drive one session: login handshake, then the command loop.
///
/// Returns when the peer disconnects or is rejected. Registry cleanup is
/// the caller's job, so it runs exactly once no matter which path exits.
async fn run_session(
    read_half: OwnedReadHalf,
    handle: u64,
    outbound: &mpsc::UnboundedSender<String>,
    service: &Service,
    shared: &SharedState,
) -> Result<(), HandshakeError> {
    let mut reader = BufReader::new(read_half);
    let mut handshake = Handshake::new();

    send(outbound, reply::USERNAME_PROMPT.to_string());
    let Some(line) = read_line(&mut reader).await else {
        handshake.disconnect();
        return Ok(());
    };
    handshake.username_received(&line)?;

    send(outbound, reply::PASSWORD_PROMPT.to_string());
    let Some(password) = read_line(&mut reader).await else {
        handshake.disconnect();
        return Ok(());
    };

    let username = match handshake.password_received(&password, &service.credentials)? {
        AuthOutcome::Accepted { username } => username,
        AuthOutcome::Rejected => {
            tracing::debug!(handle, "authentication failed");
            send(outbound, reply::AUTH_FAILED.to_string());
            handshake.disconnect();
            return Ok(());
        },
    };

    match service.sessions.register(handle, &username) {
        Ok(()) => {},
        Err(RegistryError::DuplicateLogin(_)) => {
            tracing::debug!(handle, username, "duplicate login rejected");
            send(outbound, reply::ALREADY_LOGGED_IN.to_string());
            handshake.disconnect();
            return Ok(());
        },
    }
    handshake.activate()?;

    tracing::info!(handle, username, "user joined");
    send(outbound, reply::login_success(&username));
    deliver(shared, service.router.broadcast(handle, reply::joined_chat(&username))).await;

    loop {
        let Some(line) = read_line(&mut reader).await else {
            break;
        };
        let deliveries = service.router.dispatch(handle, &username, &line);
        deliver(shared, deliveries).await;
    }

    handshake.disconnect();
    Ok(())
}

/// Execute deliveries: resolve each target to its outbound sender under
/// the read guard, then send after the guard is dropped. A target missing
/// from the map (or one whose writer already exited) is skipped; delivery
/// is best-effort.
async fn deliver(shared: &SharedState, deliveries: Vec<Delivery>) {
    if deliveries.is_empty() {
        return;
    }

    let resolved: Vec<(mpsc::UnboundedSender<String>, String)> = {
        let peers = shared.peers.read().await;
        deliveries
            .into_iter()
            .filter_map(|delivery| {
                peers.get(&delivery.target).map(|tx| (tx.clone(), delivery.text))
            })
            .collect()
    };

    for (tx, text) in resolved {
        let _ = tx.send(text);
    }
}

/// Writer task: drains one connection's outbound queue onto the socket.
///
/// Exits when every sender is dropped (cleanup removed the peer) or a
/// write fails. The queue is drained before a clean exit, so texts sent
/// just before a close still go out ahead of the FIN.
async fn write_outbound(mut writer: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(text) = rx.recv().await {
        if let Err(err) = writer.write_all(text.as_bytes()).await {
            tracing::debug!(%err, "outbound write failed, dropping queue");
            break;
        }
    }
    let _ = writer.shutdown().await;
}

/// Queue text on one connection's outbound channel. A closed channel
/// means the connection is dying; the text is dropped.
fn send(outbound: &mpsc::UnboundedSender<String>, text: String) {
    let _ = outbound.send(text);
}

/// Upper bound in bytes on one inbound line, newline included. A peer
/// whose line exceeds it is disconnected; no valid command comes close.
const MAX_LINE_BYTES: u64 = 1024;

/// Read one line of at most [`MAX_LINE_BYTES`] bytes, stripping the
/// trailing newline and an optional carriage return before it. `None` on
/// EOF, read error, invalid UTF-8, or an over-long line; each is a
/// disconnect signal.
///
/// The bound is enforced while the line arrives, not after: at most
/// [`MAX_LINE_BYTES`] bytes are buffered per call no matter how much the
/// peer streams without a newline.
async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Option<String> {
    let mut buf = Vec::new();
    let mut bounded = reader.take(MAX_LINE_BYTES);
    let read = bounded.read_until(b'\n', &mut buf).await;
    match read {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            if buf.ends_with(b"\n") {
                buf.pop();
                if buf.ends_with(b"\r") {
                    buf.pop();
                }
            } else if bounded.limit() == 0 {
                // The budget ran out before a newline arrived; the rest
                // of the line stays on the wire, unread.
                return None;
            }
            String::from_utf8(buf).ok()
        },
    }
}
