//! Display names and timestamps.

use rand::Rng;

/// Prefix of generated names for clients that send a blank name.
pub const GUEST_PREFIX: &str = "Guest_";

/// `chrono` format of every timestamp in the protocol.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Generates `Guest_` followed by four lowercase hex characters.
#[must_use]
pub fn guest_name() -> String {
    guest_name_with(&mut rand::rng())
}

/// Same as [`guest_name`] with a caller-provided random source.
#[must_use]
pub fn guest_name_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{GUEST_PREFIX}{:04x}", rng.random::<u16>())
}

/// Resolves the name a client typed during the handshake.
///
/// Surrounding whitespace is removed; a blank answer yields a guest name.
#[must_use]
pub fn resolve_name(candidate: &str) -> String {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        guest_name()
    } else {
        trimmed.to_string()
    }
}

/// Current local time as `yyyy-MM-dd HH:mm:ss`.
#[must_use]
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}
