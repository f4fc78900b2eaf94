//! Shared protocol definitions for the `LineChat` line protocol.
//!
//! Everything that crosses the wire is plain UTF-8 text, one message per
//! newline-terminated line. This crate holds the exact text of every server
//! line, the parser for client lines, and the identity helpers used during
//! the handshake. It performs no I/O.

pub mod command;
pub mod identity;
pub mod line;
