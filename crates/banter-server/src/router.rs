//! Message routing: one command line in, a list of deliveries out.
//!
//! The router is pure dispatch. It parses the line, consults the session
//! registry and group store, and returns the exact texts to write and the
//! handles to write them to. It performs no I/O and never holds a lock of
//! its own, so the runtime is free to execute the deliveries after every
//! lock is released.
//!
//! Lock order: operations that touch both stores take their snapshots
//! from the group store first and resolve sessions after, the same fixed
//! order disconnect cleanup uses, so dispatch and cleanup cannot deadlock
//! against each other.

use banter_proto::{Command, ParseError, reply};

use crate::{
    groups::{GroupError, GroupStore},
    registry::SessionRegistry,
};

/// One outbound message produced by dispatch.
///
/// `text` is the exact bytes to write; newline decisions were made when
/// the reply was formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Connection handle of the recipient.
    pub target: u64,
    /// Exact text to write.
    pub text: String,
}

/// Pure dispatch over the shared registries.
///
/// Cheap to clone: the registries share their state internally, so every
/// connection worker holds its own `Router` over the same maps.
#[derive(Debug, Clone)]
pub struct Router {
    sessions: SessionRegistry,
    groups: GroupStore,
}

impl Router {
    /// Create a router over the process-wide registries.
    pub fn new(sessions: SessionRegistry, groups: GroupStore) -> Self {
        Self { sessions, groups }
    }

    /// Dispatch one command line from an active session.
    ///
    /// Returns the deliveries to execute. An unrecognized command yields
    /// exactly one error delivery to the sender; a recognized verb with
    /// missing arguments yields nothing at all (preserved wire behavior).
    pub fn dispatch(&self, sender: u64, sender_name: &str, line: &str) -> Vec<Delivery> {
        match Command::parse(line) {
            Ok(Command::Broadcast { text }) => {
                self.broadcast(sender, reply::broadcast(sender_name, &text))
            },
            Ok(Command::Private { to, text }) => self.private(sender, sender_name, &to, &text),
            Ok(Command::CreateGroup { name }) => {
                let text = match self.groups.create(&name, sender_name) {
                    Ok(()) => reply::group_created(&name),
                    Err(err) => group_error_text(&err),
                };
                vec![Delivery { target: sender, text }]
            },
            Ok(Command::JoinGroup { name }) => {
                let text = match self.groups.join(&name, sender_name) {
                    Ok(()) => reply::group_joined(&name),
                    Err(err) => group_error_text(&err),
                };
                vec![Delivery { target: sender, text }]
            },
            Ok(Command::LeaveGroup { name }) => {
                let text = match self.groups.leave(&name, sender_name) {
                    Ok(()) => reply::group_left(&name),
                    Err(err) => group_error_text(&err),
                };
                vec![Delivery { target: sender, text }]
            },
            Ok(Command::GroupMessage { group, text }) => {
                self.group_message(sender, sender_name, &group, &text)
            },
            Err(ParseError::UnknownCommand) => {
                vec![Delivery { target: sender, text: reply::INVALID_COMMAND.to_string() }]
            },
            Err(ParseError::MissingArguments) => Vec::new(),
        }
    }

    /// Fan `text` out to every registered session except `from`.
    ///
    /// Also used directly by the runtime for the join announcement, which
    /// is preformatted rather than sender-prefixed.
    pub fn broadcast(&self, from: u64, text: String) -> Vec<Delivery> {
        self.sessions
            .snapshot_all()
            .into_iter()
            .filter(|(handle, _)| *handle != from)
            .map(|(handle, _)| Delivery { target: handle, text: text.clone() })
            .collect()
    }

    fn private(&self, sender: u64, sender_name: &str, to: &str, text: &str) -> Vec<Delivery> {
        match self.sessions.find_by_username(to) {
            Some(target) => {
                vec![Delivery { target, text: reply::private(sender_name, text) }]
            },
            // The error goes to the sender's own handle; no second lookup,
            // so no third party can receive it.
            None => vec![Delivery { target: sender, text: reply::recipient_absent(to) }],
        }
    }

    fn group_message(
        &self,
        sender: u64,
        sender_name: &str,
        group: &str,
        text: &str,
    ) -> Vec<Delivery> {
        // One snapshot decides both the membership check and the fan-out
        // set, so a concurrent leave or delete cannot split the decision.
        let members = match self.groups.members_of(group) {
            Some(members) if members.contains(sender_name) => members,
            _ => {
                return vec![Delivery { target: sender, text: reply::not_in_group(group) }];
            },
        };

        let text = reply::group_message(group, sender_name, text);
        members
            .iter()
            .filter(|member| member.as_str() != sender_name)
            // A member whose session closed but is not yet purged has no
            // registry entry; skip, not an error.
            .filter_map(|member| self.sessions.find_by_username(member))
            .map(|target| Delivery { target, text: text.clone() })
            .collect()
    }
}

fn group_error_text(err: &GroupError) -> String {
    match err {
        GroupError::GroupExists(name) => reply::group_exists(name),
        GroupError::NoSuchGroup(name) => reply::no_such_group(name),
        GroupError::NotMember(name) => reply::not_a_member(name),
    }
}
