//! Error types for command parsing.
//!
//! The two failure modes of the grammar map onto different server behavior:
//! an unknown verb earns the invalid-command reply, while a recognized verb
//! with missing arguments is dropped silently. Keeping them as separate
//! variants lets the dispatch layer make that call without re-parsing.

use thiserror::Error;

/// Errors produced by [`crate::Command::parse`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The line does not start with a recognized verb (including a verb
    /// typed without its trailing space).
    #[error("unrecognized command")]
    UnknownCommand,

    /// A recognized verb with too few arguments, e.g. `/msg bob` with no
    /// message body or `/join_group ` with an empty name.
    #[error("recognized command with missing arguments")]
    MissingArguments,
}

/// Result alias for parse operations.
pub type Result<T> = std::result::Result<T, ParseError>;
