//! Group store: named groups and their member sets.
//!
//! Lifecycle: a group comes into existence on the first `create` for its
//! name and disappears the moment its member set empties, whether the last
//! member left explicitly or their session was purged on disconnect. There
//! is no empty group, ever.
//!
//! Membership is by username, not by connection handle: a group can hold a
//! username whose session has just closed, for the short window until the
//! disconnect purge runs. Message fan-out resolves usernames to handles at
//! dispatch time and silently skips members without a live session, so
//! that window is harmless.
//!
//! Like the session registry, the store encapsulates its own lock and is
//! shared between workers through [`Clone`]; each operation is atomic with
//! respect to the others.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use thiserror::Error;

/// Errors from group lifecycle operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    /// A group with this name already exists.
    #[error("group {0:?} already exists")]
    GroupExists(String),

    /// No group with this name exists.
    #[error("group {0:?} does not exist")]
    NoSuchGroup(String),

    /// The user is not a member of this group, or the group does not
    /// exist. Both cases report the same way to the client.
    #[error("not a member of group {0:?}")]
    NotMember(String),
}

/// Store of live groups, keyed by name.
///
/// Invariant: every member set is non-empty. `leave` and
/// [`GroupStore::remove_user_everywhere`] delete any group they empty
/// within the same locked operation, so no reader ever observes an empty
/// group.
#[derive(Debug, Clone, Default)]
pub struct GroupStore {
    inner: Arc<Mutex<HashMap<String, HashSet<String>>>>,
}

impl GroupStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group with `creator` as its sole member.
    ///
    /// # Errors
    ///
    /// [`GroupError::GroupExists`] if the name is taken; the existing
    /// group is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a worker panicked while
    /// holding the lock).
    #[allow(clippy::expect_used)]
    pub fn create(&self, name: &str, creator: &str) -> Result<(), GroupError> {
        let mut groups = self.inner.lock().expect("Mutex poisoned");

        if groups.contains_key(name) {
            return Err(GroupError::GroupExists(name.to_string()));
        }

        let mut members = HashSet::new();
        members.insert(creator.to_string());
        groups.insert(name.to_string(), members);

        Ok(())
    }

    /// Add `username` to a group. Idempotent if already a member.
    ///
    /// # Errors
    ///
    /// [`GroupError::NoSuchGroup`] if the group does not exist.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn join(&self, name: &str, username: &str) -> Result<(), GroupError> {
        let mut groups = self.inner.lock().expect("Mutex poisoned");

        match groups.get_mut(name) {
            Some(members) => {
                members.insert(username.to_string());
                Ok(())
            },
            None => Err(GroupError::NoSuchGroup(name.to_string())),
        }
    }

    /// Remove `username` from a group, deleting the group if that empties
    /// it.
    ///
    /// # Errors
    ///
    /// [`GroupError::NotMember`] if the group does not exist or the user
    /// is not in it.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn leave(&self, name: &str, username: &str) -> Result<(), GroupError> {
        let mut groups = self.inner.lock().expect("Mutex poisoned");

        let Some(members) = groups.get_mut(name) else {
            return Err(GroupError::NotMember(name.to_string()));
        };

        if !members.remove(username) {
            return Err(GroupError::NotMember(name.to_string()));
        }

        if members.is_empty() {
            groups.remove(name);
        }

        Ok(())
    }

    /// Point-in-time snapshot of a group's member usernames, or `None` if
    /// the group does not exist.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn members_of(&self, name: &str) -> Option<HashSet<String>> {
        self.inner.lock().expect("Mutex poisoned").get(name).cloned()
    }

    /// Whether `username` is a member of the group. `false` if the group
    /// does not exist.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn is_member(&self, name: &str, username: &str) -> bool {
        self.inner
            .lock()
            .expect("Mutex poisoned")
            .get(name)
            .is_some_and(|members| members.contains(username))
    }

    /// Strip `username` from every group, deleting any group thereby
    /// emptied. Invoked exactly once per disconnecting session.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn remove_user_everywhere(&self, username: &str) {
        let mut groups = self.inner.lock().expect("Mutex poisoned");

        groups.retain(|_, members| {
            members.remove(username);
            !members.is_empty()
        });
    }

    /// Whether a group with this name exists.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn has_group(&self, name: &str) -> bool {
        self.inner.lock().expect("Mutex poisoned").contains_key(name)
    }

    /// Number of live groups.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn group_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").len()
    }
}
