//! `LineChat` relay library.
//!
//! Exposes the relay for use in tests and embedding. The relay accepts
//! line-oriented TCP connections, registers each under a display name, and
//! relays public and private messages between them. An independent UDP
//! announcement channel runs beside it without sharing any state.

pub mod announce;
pub mod broadcast;
pub mod config;
pub mod console;
pub mod error;
pub mod registry;
pub mod relay;
pub mod session;
pub mod sink;
