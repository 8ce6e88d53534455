//! Integration tests over real sockets.
//!
//! Each test boots the full server on an ephemeral port, connects raw
//! TCP clients, and scripts a complete conversation:
//! 1. Client connects and answers the username/password prompts
//! 2. Server announces the join to everyone already online
//! 3. Clients exchange broadcasts, private and group messages
//! 4. Disconnects purge the session and its group memberships
//!
//! Assertions are on the exact bytes each side sees on the wire.

use std::{io::Write, net::SocketAddr, time::Duration};

use banter_server::{Server, ServerConfig};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::{sleep, timeout},
};

const STEP_TIMEOUT: Duration = Duration::from_secs(5);
const QUIET_WINDOW: Duration = Duration::from_millis(150);

/// Boot a server with the given credential entries on an ephemeral port.
async fn start_server(entries: &[(&str, &str)], max_connections: usize) -> SocketAddr {
    let mut file = tempfile::NamedTempFile::new().expect("create credential file");
    for (user, pass) in entries {
        writeln!(file, "{user}:{pass}").expect("write credential");
    }
    file.flush().expect("flush credential file");

    let config = ServerConfig {
        bind_address: "127.0.0.1:0".to_string(),
        users_path: file.path().to_path_buf(),
        max_connections,
    };
    // Credentials are loaded during bind, so the file may drop after.
    let server = Server::bind(config).await.expect("bind server");
    let addr = server.local_addr().expect("local addr");
    tokio::spawn(server.run());
    addr
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Expect-style client over a raw `TcpStream`.
///
/// `expect` scans the inbound bytes for a needle and consumes through it,
/// so a test survives unrelated traffic (join announcements) arriving in
/// between, while silence checks stay exact.
struct TestClient {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        Self { stream, buf: Vec::new() }
    }

    /// Connect and answer both prompts. The login outcome line is left
    /// for the caller to assert.
    async fn login(addr: SocketAddr, username: &str, password: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client.expect("Enter username: ").await;
        client.send_line(username).await;
        client.expect("Enter password: ").await;
        client.send_line(password).await;
        client
    }

    async fn send_line(&mut self, line: &str) {
        let framed = format!("{line}\n");
        self.stream.write_all(framed.as_bytes()).await.expect("send line");
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.expect("send raw");
    }

    /// Read until the inbound bytes contain `needle`, then consume
    /// through the end of the match.
    async fn expect(&mut self, needle: &str) {
        let found = timeout(STEP_TIMEOUT, self.read_until(needle)).await;
        assert!(
            found.is_ok(),
            "timed out waiting for {needle:?}; buffered: {:?}",
            String::from_utf8_lossy(&self.buf)
        );
    }

    async fn read_until(&mut self, needle: &str) {
        loop {
            if let Some(pos) = find_subslice(&self.buf, needle.as_bytes()) {
                self.buf.drain(..pos + needle.len());
                return;
            }
            let mut chunk = [0u8; 1024];
            let n = self.stream.read(&mut chunk).await.expect("read");
            assert!(
                n > 0,
                "connection closed while waiting for {needle:?}; buffered: {:?}",
                String::from_utf8_lossy(&self.buf)
            );
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Assert that nothing arrives within the quiet window.
    ///
    /// Only meaningful once every previously expected line has been
    /// consumed; call it with a drained stream.
    async fn expect_silence(&mut self) {
        let mut chunk = [0u8; 256];
        match timeout(QUIET_WINDOW, self.stream.read(&mut chunk)).await {
            Err(_) => {},
            Ok(Ok(0)) => panic!("connection closed during quiet window"),
            Ok(Ok(n)) => panic!(
                "unexpected bytes during quiet window: {:?}",
                String::from_utf8_lossy(&chunk[..n])
            ),
            Ok(Err(e)) => panic!("read error during quiet window: {e}"),
        }
    }

    /// Read until the server closes the connection, draining any
    /// trailing bytes.
    async fn expect_close(&mut self) {
        let closed = timeout(STEP_TIMEOUT, async {
            let mut chunk = [0u8; 256];
            loop {
                match self.stream.read(&mut chunk).await {
                    Ok(0) | Err(_) => return,
                    Ok(_) => {},
                }
            }
        })
        .await;
        assert!(closed.is_ok(), "server did not close the connection");
    }

    /// Resolve which way the accept went: `true` when the username
    /// prompt arrives, `false` when the server closes instead. The
    /// prompt bytes stay buffered for a later `expect`.
    async fn prompt_or_close(&mut self) -> bool {
        let outcome = timeout(STEP_TIMEOUT, async {
            loop {
                if find_subslice(&self.buf, b"Enter username: ").is_some() {
                    return true;
                }
                let mut chunk = [0u8; 256];
                match self.stream.read(&mut chunk).await {
                    Ok(0) | Err(_) => return false,
                    Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                }
            }
        })
        .await;
        outcome.expect("server neither prompted nor closed")
    }
}

/// The full two-user session: login, join announcement, group lifecycle,
/// and membership surviving the other member's disconnect.
#[tokio::test]
async fn alice_and_bob_full_session_flow() {
    let addr = start_server(&[("alice", "secret"), ("bob", "hunter2")], 100).await;

    let mut alice = TestClient::login(addr, "alice", "secret").await;
    alice.expect("Login successful! Welcome alice\n").await;

    let mut bob = TestClient::login(addr, "bob", "hunter2").await;
    bob.expect("Login successful! Welcome bob\n").await;

    // Everyone already online hears about the join; the joiner does not.
    alice.expect("bob has joined the chat.\n").await;

    alice.send_line("/create_group team").await;
    alice.expect("Group 'team' created successfully!\n").await;

    // Creating it again is an error for anyone.
    bob.send_line("/create_group team").await;
    bob.expect("Error: Group 'team' already exists!\n").await;

    bob.send_line("/join_group team").await;
    bob.expect("You have joined the group 'team'.\n").await;

    // Group message reaches the other member, never the sender.
    alice.send_line("/group_msg team hello").await;
    bob.expect("(Group team) alice: hello").await;
    alice.expect_silence().await;

    // Bob drops; his session and memberships are purged, the group stays.
    drop(bob);
    sleep(Duration::from_millis(200)).await;

    // Joining a group you are already in is a quiet success, so this
    // doubles as proof the group survived losing its last other member.
    alice.send_line("/join_group team").await;
    alice.expect("You have joined the group 'team'.\n").await;

    // Sole member: the message has no recipients and no error.
    alice.send_line("/group_msg team anyone").await;
    alice.expect_silence().await;

    alice.send_line("/leave_group team").await;
    alice.expect("You have left the group 'team'.\n").await;

    // The group deleted itself when emptied.
    alice.send_line("/group_msg team hello").await;
    alice
        .expect("Error: You are not part of the group team or the group doesn't exist.")
        .await;
}

#[tokio::test]
async fn rejects_bad_credentials_and_closes() {
    let addr = start_server(&[("alice", "secret")], 100).await;

    let mut client = TestClient::login(addr, "alice", "wrong").await;
    client.expect("Error: Authentication failed. Disconnecting...\n").await;
    client.expect_close().await;
}

#[tokio::test]
async fn rejects_unknown_username() {
    let addr = start_server(&[("alice", "secret")], 100).await;

    let mut client = TestClient::login(addr, "mallory", "secret").await;
    client.expect("Error: Authentication failed. Disconnecting...\n").await;
    client.expect_close().await;
}

#[tokio::test]
async fn empty_credential_store_rejects_everyone() {
    let addr = start_server(&[], 100).await;

    let mut client = TestClient::login(addr, "alice", "secret").await;
    client.expect("Error: Authentication failed. Disconnecting...\n").await;
    client.expect_close().await;
}

/// A second login for an already-online username is refused after the
/// password check and the original session keeps working.
#[tokio::test]
async fn duplicate_login_rejected_and_original_session_survives() {
    let addr = start_server(&[("alice", "secret"), ("bob", "hunter2")], 100).await;

    let mut first = TestClient::login(addr, "alice", "secret").await;
    first.expect("Login successful! Welcome alice\n").await;

    let mut second = TestClient::login(addr, "alice", "secret").await;
    second.expect("Error: Username already logged in!\n").await;
    second.expect_close().await;

    // The original session is untouched.
    let mut bob = TestClient::login(addr, "bob", "hunter2").await;
    bob.expect("Login successful! Welcome bob\n").await;
    first.expect("bob has joined the chat.\n").await;

    first.send_line("/broadcast still here").await;
    bob.expect("alice: still here").await;
}

#[tokio::test]
async fn private_message_routing_and_unknown_recipient() {
    let addr = start_server(&[("alice", "secret"), ("bob", "hunter2")], 100).await;

    let mut alice = TestClient::login(addr, "alice", "secret").await;
    alice.expect("Login successful! Welcome alice\n").await;
    let mut bob = TestClient::login(addr, "bob", "hunter2").await;
    bob.expect("Login successful! Welcome bob\n").await;
    alice.expect("bob has joined the chat.\n").await;

    alice.send_line("/msg bob psst").await;
    bob.expect("(Private) alice: psst").await;

    // Unknown recipient: one error to the sender, nothing to anyone else.
    alice.send_line("/msg ghost psst").await;
    alice.expect("Error: User ghost is not online or does not exist.").await;
    bob.expect_silence().await;
}

#[tokio::test]
async fn broadcast_reaches_every_other_user_once() {
    let creds = [("alice", "a"), ("bob", "b"), ("carol", "c")];
    let addr = start_server(&creds, 100).await;

    let mut alice = TestClient::login(addr, "alice", "a").await;
    alice.expect("Login successful! Welcome alice\n").await;
    let mut bob = TestClient::login(addr, "bob", "b").await;
    bob.expect("Login successful! Welcome bob\n").await;
    alice.expect("bob has joined the chat.\n").await;
    let mut carol = TestClient::login(addr, "carol", "c").await;
    carol.expect("Login successful! Welcome carol\n").await;
    alice.expect("carol has joined the chat.\n").await;
    bob.expect("carol has joined the chat.\n").await;

    alice.send_line("/broadcast hello room").await;
    bob.expect("alice: hello room").await;
    carol.expect("alice: hello room").await;
    alice.expect_silence().await;
}

/// Unknown verbs get the invalid-command error; a known verb with empty
/// arguments is dropped silently and the session stays usable.
#[tokio::test]
async fn invalid_command_error_and_missing_arguments_silence() {
    let addr = start_server(&[("alice", "secret"), ("bob", "hunter2")], 100).await;

    let mut alice = TestClient::login(addr, "alice", "secret").await;
    alice.expect("Login successful! Welcome alice\n").await;
    let mut bob = TestClient::login(addr, "bob", "hunter2").await;
    bob.expect("Login successful! Welcome bob\n").await;
    alice.expect("bob has joined the chat.\n").await;

    alice.send_line("/dance").await;
    alice.expect("Error: Invalid command. Please use a valid command.\n").await;

    // Bare verb with no argument text: silently ignored.
    alice.send_line("/broadcast ").await;
    alice.expect_silence().await;
    bob.expect_silence().await;

    alice.send_line("/msg bob").await;
    alice.expect_silence().await;
    bob.expect_silence().await;

    // Plain text without a leading slash is also invalid.
    alice.send_line("hello?").await;
    alice.expect("Error: Invalid command. Please use a valid command.\n").await;

    // The session survived all of it.
    alice.send_line("/msg bob still alive").await;
    bob.expect("(Private) alice: still alive").await;
}

/// CRLF line endings (telnet-style clients) authenticate and chat the
/// same as bare-LF clients.
#[tokio::test]
async fn tolerates_carriage_return_line_endings() {
    let addr = start_server(&[("alice", "secret"), ("bob", "hunter2")], 100).await;

    let mut bob = TestClient::login(addr, "bob", "hunter2").await;
    bob.expect("Login successful! Welcome bob\n").await;

    let mut alice = TestClient::connect(addr).await;
    alice.expect("Enter username: ").await;
    alice.send_raw(b"alice\r\n").await;
    alice.expect("Enter password: ").await;
    alice.send_raw(b"secret\r\n").await;
    alice.expect("Login successful! Welcome alice\n").await;

    alice.send_raw(b"/msg bob over here\r\n").await;
    bob.expect("(Private) alice: over here").await;
}

/// Connections beyond the cap are dropped before the username prompt.
#[tokio::test]
async fn connection_cap_drops_excess_connections() {
    let addr = start_server(&[("alice", "secret")], 1).await;

    let mut alice = TestClient::login(addr, "alice", "secret").await;
    alice.expect("Login successful! Welcome alice\n").await;

    let mut second = TestClient::connect(addr).await;
    second.expect_close().await;
}

/// The last slot is claimed at accept time: of two connections arriving
/// together, exactly one gets the prompt, before either has logged in.
#[tokio::test]
async fn connection_cap_holds_for_simultaneous_connects() {
    let addr = start_server(&[("alice", "secret")], 1).await;

    let (first, second) = tokio::join!(TcpStream::connect(addr), TcpStream::connect(addr));
    let mut first = TestClient { stream: first.expect("first connect"), buf: Vec::new() };
    let mut second = TestClient { stream: second.expect("second connect"), buf: Vec::new() };

    let first_prompted = first.prompt_or_close().await;
    let second_prompted = second.prompt_or_close().await;
    assert!(
        first_prompted != second_prompted,
        "exactly one of two simultaneous connections should win the slot"
    );

    // The winner holds a working session.
    let mut winner = if first_prompted { first } else { second };
    winner.expect("Enter username: ").await;
    winner.send_line("alice").await;
    winner.expect("Enter password: ").await;
    winner.send_line("secret").await;
    winner.expect("Login successful! Welcome alice\n").await;
}

/// A partial command split across two writes is reassembled at the
/// newline, not processed per receive call.
#[tokio::test]
async fn reassembles_commands_split_across_writes() {
    let addr = start_server(&[("alice", "secret"), ("bob", "hunter2")], 100).await;

    let mut alice = TestClient::login(addr, "alice", "secret").await;
    alice.expect("Login successful! Welcome alice\n").await;
    let mut bob = TestClient::login(addr, "bob", "hunter2").await;
    bob.expect("Login successful! Welcome bob\n").await;
    alice.expect("bob has joined the chat.\n").await;

    alice.send_raw(b"/msg bo").await;
    sleep(Duration::from_millis(50)).await;
    alice.send_raw(b"b split message\n").await;
    bob.expect("(Private) alice: split message").await;
}

/// A line that never ends is cut off at the inbound cap: the peer is
/// dropped instead of buffered, and the server keeps serving others.
#[tokio::test]
async fn overlong_unterminated_line_disconnects_the_peer() {
    let addr = start_server(&[("alice", "secret")], 100).await;

    let mut flood = TestClient::connect(addr).await;
    flood.expect("Enter username: ").await;
    // Four kilobytes of username with no newline in sight.
    flood.send_raw(&[b'a'; 4096]).await;
    flood.expect_close().await;

    let mut alice = TestClient::login(addr, "alice", "secret").await;
    alice.expect("Login successful! Welcome alice\n").await;
}

/// Long lines under the cap still go through whole.
#[tokio::test]
async fn long_terminated_line_is_delivered_in_full() {
    let addr = start_server(&[("alice", "secret"), ("bob", "hunter2")], 100).await;

    let mut alice = TestClient::login(addr, "alice", "secret").await;
    alice.expect("Login successful! Welcome alice\n").await;
    let mut bob = TestClient::login(addr, "bob", "hunter2").await;
    bob.expect("Login successful! Welcome bob\n").await;
    alice.expect("bob has joined the chat.\n").await;

    let text = "x".repeat(900);
    alice.send_line(&format!("/broadcast {text}")).await;
    bob.expect(&format!("alice: {text}")).await;
}
