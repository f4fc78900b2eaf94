//! Parser for lines sent by a connected client.
//!
//! A client line is either a private command (`@<name> <message>`) or free
//! text that is relayed to everyone. Private commands are tokenised as three
//! fields: the `@` marker, the target name, and the rest of the line.

/// Marker that starts a private-message command.
pub const PRIVATE_PREFIX: char = '@';

/// A parsed client line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Free text for every registered session.
    Public(&'a str),
    /// A message for exactly one registered name.
    Private {
        /// Display name the message is addressed to.
        target: &'a str,
        /// Message body, verbatim after the separating whitespace.
        body: &'a str,
    },
    /// A private command with fewer than three fields. Dropped without reply.
    Malformed,
}

impl<'a> Command<'a> {
    /// Classifies a single line (without its line terminator).
    ///
    /// Leading whitespace after the `@` is skipped, so both `@bob hi` and
    /// `@ bob hi` address `bob`. Anything not starting with `@` is public,
    /// including the empty line.
    #[must_use]
    pub fn parse(line: &'a str) -> Self {
        let Some(rest) = line.strip_prefix(PRIVATE_PREFIX) else {
            return Self::Public(line);
        };

        let Some((target, body)) = rest.trim_start().split_once(char::is_whitespace) else {
            return Self::Malformed;
        };

        let body = body.trim_start();
        if target.is_empty() || body.is_empty() {
            return Self::Malformed;
        }

        Self::Private { target, body }
    }
}
