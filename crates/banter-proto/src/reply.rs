//! Literal server reply strings.
//!
//! Every byte the server writes originates here, so wire compatibility
//! with existing clients is auditable in one file. Which strings carry a
//! trailing newline is part of the protocol: prompts are sent bare so the
//! client cursor stays on the prompt line, login/lifecycle notices end in
//! `\n`, and relayed chat messages (private, group, broadcast) are sent
//! exactly as formatted with no added newline.

/// Username prompt, sent immediately after accept. No trailing newline.
pub const USERNAME_PROMPT: &str = "Enter username: ";

/// Password prompt, sent after the username line. No trailing newline.
pub const PASSWORD_PROMPT: &str = "Enter password: ";

/// Sent before closing when credentials do not match.
pub const AUTH_FAILED: &str = "Error: Authentication failed. Disconnecting...\n";

/// Sent before closing when the username already has a live session.
pub const ALREADY_LOGGED_IN: &str = "Error: Username already logged in!\n";

/// Sent back for a line with no recognized verb. The connection stays
/// open.
pub const INVALID_COMMAND: &str = "Error: Invalid command. Please use a valid command.\n";

/// Greeting for a freshly authenticated session.
pub fn login_success(username: &str) -> String {
    format!("Login successful! Welcome {username}\n")
}

/// Announcement fanned out to every other session when a user logs in.
pub fn joined_chat(username: &str) -> String {
    format!("{username} has joined the chat.\n")
}

/// A relayed broadcast line. No trailing newline.
pub fn broadcast(sender: &str, text: &str) -> String {
    format!("{sender}: {text}")
}

/// A relayed private message. No trailing newline.
pub fn private(sender: &str, text: &str) -> String {
    format!("(Private) {sender}: {text}")
}

/// Sent to the sender when the private-message recipient has no live
/// session. No trailing newline.
pub fn recipient_absent(recipient: &str) -> String {
    format!("Error: User {recipient} is not online or does not exist.")
}

/// Confirmation for a successful group creation.
pub fn group_created(name: &str) -> String {
    format!("Group '{name}' created successfully!\n")
}

/// Sent to the sender when the group name is already taken.
pub fn group_exists(name: &str) -> String {
    format!("Error: Group '{name}' already exists!\n")
}

/// Confirmation for a successful group join.
pub fn group_joined(name: &str) -> String {
    format!("You have joined the group '{name}'.\n")
}

/// Sent to the sender when the named group does not exist.
pub fn no_such_group(name: &str) -> String {
    format!("Error: Group '{name}' does not exist!\n")
}

/// Confirmation for a successful group leave.
pub fn group_left(name: &str) -> String {
    format!("You have left the group '{name}'.\n")
}

/// Sent to the sender when leaving a group they are not in (or one that
/// does not exist).
pub fn not_a_member(name: &str) -> String {
    format!("Error: You are not a member of group '{name}'.\n")
}

/// A relayed group message. No trailing newline.
pub fn group_message(group: &str, sender: &str, text: &str) -> String {
    format!("(Group {group}) {sender}: {text}")
}

/// Sent to the sender of a group message when they are not a member or
/// the group does not exist. No trailing newline.
pub fn not_in_group(group: &str) -> String {
    format!("Error: You are not part of the group {group} or the group doesn't exist.")
}
