//! Session registry: connection handle → authenticated username.
//!
//! The registry maintains a bidirectional mapping: handle → username for
//! fan-out and cleanup, username → handle for recipient lookup and for
//! enforcing one live session per username. Both directions are O(1).
//!
//! Uniqueness is enforced at registration time, not lookup time: a second
//! login for an already-bound username fails and leaves the registry
//! untouched, while the existing session keeps running.
//!
//! The registry encapsulates its own lock. Connection workers share one
//! instance through [`Clone`] (the state lives behind an `Arc`) and call
//! `&self` methods; no guard ever escapes, and no method blocks on
//! anything but the lock itself, so holding patterns stay trivial.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use thiserror::Error;

/// Errors from session registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The username already has a live session. The existing session is
    /// unaffected.
    #[error("username {0:?} already logged in")]
    DuplicateLogin(String),
}

#[derive(Debug, Default)]
struct SessionRegistryInner {
    /// Connection handle → username
    by_handle: HashMap<u64, String>,
    /// Username → connection handle (reverse index). Enforces one session
    /// per username.
    by_username: HashMap<String, u64>,
}

/// Registry of live authenticated sessions.
///
/// Invariant: for every username, at most one entry exists at any instant.
/// Every mutation keeps the two maps consistent within a single locked
/// section, so readers never observe a half-applied registration.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<SessionRegistryInner>>,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authenticated session.
    ///
    /// Callers register a given handle at most once; handles are allocated
    /// fresh per connection and never reused.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateLogin`] if the username is already bound
    /// to a live session. The registry is unchanged in that case.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a worker panicked while
    /// holding the lock), in which case the maps may be inconsistent and
    /// continuing would be worse than stopping.
    #[allow(clippy::expect_used)]
    pub fn register(&self, handle: u64, username: &str) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        if inner.by_username.contains_key(username) {
            return Err(RegistryError::DuplicateLogin(username.to_string()));
        }

        debug_assert!(!inner.by_handle.contains_key(&handle), "handle registered twice");

        inner.by_username.insert(username.to_string(), handle);
        inner.by_handle.insert(handle, username.to_string());

        Ok(())
    }

    /// Remove the session for `handle`, returning the username it was
    /// bound to.
    ///
    /// Idempotent: unregistering an unknown (or already removed) handle
    /// returns `None` and changes nothing.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn unregister(&self, handle: u64) -> Option<String> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        let username = inner.by_handle.remove(&handle)?;
        let removed = inner.by_username.remove(&username);
        debug_assert_eq!(removed, Some(handle));

        Some(username)
    }

    /// Handle currently bound to `username`, or `None` if the user has no
    /// live session.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn find_by_username(&self, username: &str) -> Option<u64> {
        self.inner.lock().expect("Mutex poisoned").by_username.get(username).copied()
    }

    /// Whether `handle` has a registered session.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn has_session(&self, handle: u64) -> bool {
        self.inner.lock().expect("Mutex poisoned").by_handle.contains_key(&handle)
    }

    /// Point-in-time snapshot of every `(handle, username)` pair.
    ///
    /// Taken under the lock, so the pairs are mutually consistent; fan-out
    /// using the snapshot happens after the lock is released.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn snapshot_all(&self) -> Vec<(u64, String)> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        inner.by_handle.iter().map(|(handle, username)| (*handle, username.clone())).collect()
    }

    /// Number of live sessions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn session_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").by_handle.len()
    }
}
