//! Errors that stop the relay process.
//!
//! Recoverable failures such as per-session I/O are handled where they
//! happen; only socket setup failures surface here.

use std::net::SocketAddr;

/// Fatal relay setup errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The stream listener could not bind.
    #[error("failed to bind relay listener on {addr}: {source}")]
    Bind {
        /// Address that was attempted.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The announcement socket could not be created or bound.
    #[error("failed to set up announcement socket on {addr}: {source}")]
    AnnounceSocket {
        /// Local address that was attempted.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The announcement target host did not resolve.
    #[error("failed to resolve announcement target {host}:{port}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured datagram port.
        port: u16,
        /// Underlying I/O error, if the lookup itself failed.
        #[source]
        source: Option<std::io::Error>,
    },
}
