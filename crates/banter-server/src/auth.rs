//! Credential store: the `username:password` file, loaded once at startup.
//!
//! One entry per line, split at the first `:` so passwords may contain
//! colons. A single trailing carriage return is stripped from the password
//! to tolerate files written with CRLF endings. Lines without a separator
//! are skipped; a later entry for the same username wins.
//!
//! A missing or unreadable file is logged and yields an empty store: the
//! service still starts and accepts connections, but every login fails.

use std::{collections::HashMap, path::Path};

/// Immutable credential map checked during the login handshake.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: HashMap<String, String>,
}

impl CredentialStore {
    /// Load credentials from `path`.
    ///
    /// Never fails: unreadable files log an error and produce an empty
    /// store.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let store = Self::parse(&contents);
                tracing::info!(path = %path.display(), users = store.len(), "loaded credentials");
                store
            },
            Err(err) => {
                tracing::error!(
                    path = %path.display(),
                    %err,
                    "failed to read credential file; no login will succeed"
                );
                Self::default()
            },
        }
    }

    /// Build a store from literal entries. Intended for tests.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let users = entries
            .into_iter()
            .map(|(username, password)| (username.to_string(), password.to_string()))
            .collect();
        Self { users }
    }

    fn parse(contents: &str) -> Self {
        let mut users = HashMap::new();

        for line in contents.lines() {
            let Some((username, password)) = line.split_once(':') else {
                continue;
            };
            // lines() already strips \r\n; this catches a stray \r before
            // a bare \n.
            let password = password.strip_suffix('\r').unwrap_or(password);
            users.insert(username.to_string(), password.to_string());
        }

        Self { users }
    }

    /// Whether `password` is the stored password for `username`. Unknown
    /// usernames verify as `false`.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users.get(username).is_some_and(|expected| expected == password)
    }

    /// Number of loaded entries.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
