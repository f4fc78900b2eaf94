//! Exact text of every line the relay writes.
//!
//! Stream lines are sent without their terminator; the writer appends `\n`.
//! Datagram payloads carry no terminator at all.

/// First line sent on a new connection.
pub const WELCOME: &str = "Welcome to the chat!";

/// Second line sent on a new connection; the reply is the display name.
pub const NAME_PROMPT: &str = "Enter your name and press Enter:";

/// Lines sent once the name is established.
#[must_use]
pub fn greeting_lines(name: &str) -> [String; 3] {
    [
        format!("Hello, {name}! You are connected to the chat."),
        "To leave, just close the connection.".to_string(),
        "To send a private message use: @<name> <message>".to_string(),
    ]
}

/// A public message as every session receives it.
#[must_use]
pub fn chat_line(timestamp: &str, sender: &str, text: &str) -> String {
    format!("{timestamp} {sender}: {text}")
}

/// Acknowledgement sent back to the author of a public message.
#[must_use]
pub fn echo_line(chat_line: &str) -> String {
    format!("[You sent]: {chat_line}")
}

/// A private message as its target receives it.
#[must_use]
pub fn private_line(sender: &str, body: &str) -> String {
    format!("[Private from {sender}]: {body}")
}

/// Reply to a private message whose target is not registered.
#[must_use]
pub fn not_found_line(target: &str) -> String {
    format!("User {target} not found.")
}

/// Arrival notice broadcast after registration.
#[must_use]
pub fn joined_line(timestamp: &str, name: &str) -> String {
    format!("{timestamp} {name} joined the chat.")
}

/// Departure notice broadcast after teardown.
#[must_use]
pub fn left_line(timestamp: &str, name: &str) -> String {
    format!("{timestamp} {name} left the chat.")
}

/// Final line for a session whose name was taken over by a newer connection.
#[must_use]
pub fn evicted_line(name: &str) -> String {
    format!("Another connection registered as {name}; this session is closed.")
}

/// Final line for a session closed after a period without input.
#[must_use]
pub fn idle_line(secs: u64) -> String {
    format!("No input for {secs} seconds; closing the connection.")
}

/// Final line for a session that sent a line longer than `max` bytes.
#[must_use]
pub fn too_long_line(max: usize) -> String {
    format!("Lines are limited to {max} bytes; closing the connection.")
}

/// Payload of an outgoing announcement datagram.
#[must_use]
pub fn announcement_line(timestamp: &str, text: &str) -> String {
    format!("{timestamp} {text}")
}

/// How a received announcement is reported on the operator console.
#[must_use]
pub fn received_announcement_line(timestamp: &str, payload: &str) -> String {
    format!("{timestamp} UDP: {payload}")
}
