//! Login handshake state machine.
//!
//! One instance per connection, driven by that connection's worker. The
//! machine is pure: the worker performs the prompt writes and line reads
//! and feeds the results in, so every transition is testable without a
//! socket.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────────────┐ username ┌──────────────────┐ valid creds +  ┌────────┐
//! │ Unauthenticated │─────────>│ AwaitingPassword │───────────────>│ Active │
//! └─────────────────┘   line   └──────────────────┘  registration  └────────┘
//!          │                            │                               │
//!          │ read failure               │ bad creds / dup login /       │ EOF /
//!          │                            │ read failure                  │ read failure
//!          ↓                            ↓                               ↓
//!    ┌──────────────┐            ┌──────────────┐                ┌──────────────┐
//!    │ Disconnected │            │ Disconnected │                │ Disconnected │
//!    └──────────────┘            └──────────────┘                └──────────────┘
//! ```
//!
//! Credential validation happens on the password line; session
//! registration (the duplicate-login check) is the caller's step between
//! an accepted password and [`Handshake::activate`], because it can still
//! fail and the failure must not leave the machine claiming an active
//! session.

use thiserror::Error;

use crate::auth::CredentialStore;

/// Login handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Connected; waiting for the username line.
    Unauthenticated,
    /// Username received; waiting for the password line.
    AwaitingPassword,
    /// Credentials accepted and session registered; command loop runs.
    Active,
    /// Terminal. Reached from every state on close, rejection, or read
    /// failure.
    Disconnected,
}

/// Errors from driving the handshake out of order.
///
/// These indicate a bug in the connection worker, not a wire condition a
/// client can produce.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// Operation applied in a state that does not accept it.
    #[error("invalid handshake transition: cannot {operation} while {state:?}")]
    InvalidState {
        /// State the machine was in.
        state: HandshakeState,
        /// Operation that was attempted.
        operation: &'static str,
    },
}

/// Decision produced by the password step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credentials match; the caller should attempt registration under
    /// this username and then [`Handshake::activate`].
    Accepted {
        /// The username given in the first handshake line.
        username: String,
    },
    /// Unknown username or wrong password. The caller sends the failure
    /// text and disconnects; no registration is attempted.
    Rejected,
}

/// Per-connection login handshake.
#[derive(Debug, Clone)]
pub struct Handshake {
    state: HandshakeState,
    username: Option<String>,
    verified: bool,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

impl Handshake {
    /// Create a machine in [`HandshakeState::Unauthenticated`].
    pub fn new() -> Self {
        Self { state: HandshakeState::Unauthenticated, username: None, verified: false }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Feed the username line.
    ///
    /// The username is held verbatim; whether it exists is decided
    /// together with the password, so the prompt sequence never leaks
    /// which usernames are valid.
    ///
    /// # Errors
    ///
    /// [`HandshakeError::InvalidState`] unless the machine is
    /// [`HandshakeState::Unauthenticated`].
    pub fn username_received(&mut self, line: &str) -> Result<(), HandshakeError> {
        match self.state {
            HandshakeState::Unauthenticated => {
                self.username = Some(line.to_string());
                self.state = HandshakeState::AwaitingPassword;
                Ok(())
            },
            state => Err(HandshakeError::InvalidState { state, operation: "accept username" }),
        }
    }

    /// Feed the password line and check it against the credential store.
    ///
    /// On [`AuthOutcome::Accepted`] the machine stays in
    /// [`HandshakeState::AwaitingPassword`] until the caller registers the
    /// session and calls [`Handshake::activate`]. On
    /// [`AuthOutcome::Rejected`] the caller is expected to disconnect.
    ///
    /// # Errors
    ///
    /// [`HandshakeError::InvalidState`] unless the machine is
    /// [`HandshakeState::AwaitingPassword`].
    pub fn password_received(
        &mut self,
        line: &str,
        credentials: &CredentialStore,
    ) -> Result<AuthOutcome, HandshakeError> {
        match (self.state, self.username.as_ref()) {
            (HandshakeState::AwaitingPassword, Some(username)) => {
                if credentials.verify(username, line) {
                    self.verified = true;
                    Ok(AuthOutcome::Accepted { username: username.clone() })
                } else {
                    Ok(AuthOutcome::Rejected)
                }
            },
            (state, _) => {
                Err(HandshakeError::InvalidState { state, operation: "accept password" })
            },
        }
    }

    /// Mark the session active, after credentials were accepted and the
    /// registry took the registration.
    ///
    /// # Errors
    ///
    /// [`HandshakeError::InvalidState`] unless the machine is
    /// [`HandshakeState::AwaitingPassword`] with verified credentials.
    pub fn activate(&mut self) -> Result<(), HandshakeError> {
        match self.state {
            HandshakeState::AwaitingPassword if self.verified => {
                self.state = HandshakeState::Active;
                Ok(())
            },
            state => Err(HandshakeError::InvalidState { state, operation: "activate" }),
        }
    }

    /// Enter the terminal state. Valid from every state and idempotent;
    /// read failures, rejections, and EOF all funnel through here.
    pub fn disconnect(&mut self) {
        self.state = HandshakeState::Disconnected;
    }
}
