//! Wire grammar for the banter chat protocol.
//!
//! The protocol is newline-delimited UTF-8 text over a reliable ordered
//! byte stream. This crate is pure: it parses inbound command lines
//! ([`Command::parse`]) and owns every literal string the server writes
//! ([`reply`]), so the exact wire bytes live in one place. No I/O, no
//! shared state.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
pub mod errors;
pub mod reply;

pub use command::Command;
pub use errors::{ParseError, Result};
