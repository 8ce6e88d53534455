//! Fuzz target for Command::parse
//!
//! Feeds arbitrary byte sequences through the command parser to find:
//! - Parser crashes or panics
//! - Slicing outside UTF-8 character boundaries
//! - Inputs misclassified as a command they do not spell
//!
//! The parser should NEVER panic. Unrecognized inputs must come back as
//! errors, and every accepted command must carry the exact argument text
//! from the input line.

#![no_main]

use banter_proto::Command;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    // Must never panic, only classify.
    let Ok(command) = Command::parse(line) else {
        return;
    };

    // An accepted command always reproduces its input exactly.
    let rebuilt = match command {
        Command::Broadcast { text } => format!("/broadcast {text}"),
        Command::Private { to, text } => format!("/msg {to} {text}"),
        Command::CreateGroup { name } => format!("/create_group {name}"),
        Command::JoinGroup { name } => format!("/join_group {name}"),
        Command::LeaveGroup { name } => format!("/leave_group {name}"),
        Command::GroupMessage { group, text } => format!("/group_msg {group} {text}"),
    };
    assert_eq!(rebuilt, line, "parse lost or reordered argument bytes");
});
