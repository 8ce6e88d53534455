//! Client command grammar.
//!
//! One logical command per line; the line reaches the parser with its
//! trailing newline (and optional carriage return) already stripped.
//!
//! The grammar is prefix-based and deliberately literal-minded, preserving
//! the behavior existing clients depend on:
//! - A verb matches only together with the space separating it from its
//!   arguments, so `/broadcast` alone is an unknown command.
//! - `/msg` and `/group_msg` split their remainder at the *first* space;
//!   everything after it is the message body, spaces included.
//! - Group names and broadcast text are the entire remainder of the line,
//!   so names may contain spaces.
//! - An empty recipient or group name (two spaces after the verb) parses
//!   successfully and is resolved downstream like any other name.

use crate::errors::{ParseError, Result};

/// A parsed client command.
///
/// Produced by [`Command::parse`] from one inbound line. All fields are
/// owned; the dispatch layer formats deliveries from them without keeping
/// the input line alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/broadcast <text>`: send `text` to every other live session.
    Broadcast {
        /// Message body, the entire remainder of the line.
        text: String,
    },

    /// `/msg <username> <text>`: direct message to one user.
    Private {
        /// Recipient username; empty if the client sent a double space.
        to: String,
        /// Message body, everything after the first space.
        text: String,
    },

    /// `/create_group <name>`: create a group with the sender as sole
    /// member.
    CreateGroup {
        /// Group name, the entire remainder of the line.
        name: String,
    },

    /// `/join_group <name>`: join an existing group.
    JoinGroup {
        /// Group name, the entire remainder of the line.
        name: String,
    },

    /// `/leave_group <name>`: leave a group the sender belongs to.
    LeaveGroup {
        /// Group name, the entire remainder of the line.
        name: String,
    },

    /// `/group_msg <name> <text>`: send `text` to the other members of a
    /// group.
    GroupMessage {
        /// Group name; empty if the client sent a double space.
        group: String,
        /// Message body, everything after the first space.
        text: String,
    },
}

impl Command {
    /// Parse one command line.
    ///
    /// # Errors
    ///
    /// - [`ParseError::UnknownCommand`] if the line starts with no
    ///   recognized verb-plus-space prefix (empty lines and bare verbs
    ///   land here).
    /// - [`ParseError::MissingArguments`] if the verb is recognized but
    ///   the remainder is empty, or (for `/msg` and `/group_msg`) contains
    ///   no space to split recipient from body.
    pub fn parse(line: &str) -> Result<Self> {
        if let Some(rest) = line.strip_prefix("/broadcast ") {
            if rest.is_empty() {
                return Err(ParseError::MissingArguments);
            }
            return Ok(Self::Broadcast { text: rest.to_string() });
        }

        if let Some(rest) = line.strip_prefix("/msg ") {
            return match rest.split_once(' ') {
                Some((to, text)) => {
                    Ok(Self::Private { to: to.to_string(), text: text.to_string() })
                },
                None => Err(ParseError::MissingArguments),
            };
        }

        if let Some(rest) = line.strip_prefix("/create_group ") {
            if rest.is_empty() {
                return Err(ParseError::MissingArguments);
            }
            return Ok(Self::CreateGroup { name: rest.to_string() });
        }

        if let Some(rest) = line.strip_prefix("/join_group ") {
            if rest.is_empty() {
                return Err(ParseError::MissingArguments);
            }
            return Ok(Self::JoinGroup { name: rest.to_string() });
        }

        if let Some(rest) = line.strip_prefix("/leave_group ") {
            if rest.is_empty() {
                return Err(ParseError::MissingArguments);
            }
            return Ok(Self::LeaveGroup { name: rest.to_string() });
        }

        if let Some(rest) = line.strip_prefix("/group_msg ") {
            return match rest.split_once(' ') {
                Some((group, text)) => {
                    Ok(Self::GroupMessage { group: group.to_string(), text: text.to_string() })
                },
                None => Err(ParseError::MissingArguments),
            };
        }

        Err(ParseError::UnknownCommand)
    }
}
