//! Relay server core: shared state and the stream listener.
//!
//! The listener accepts TCP connections and spawns an independent
//! [`Session`] for each. Sessions share nothing but the [`Registry`] held in
//! [`RelayState`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use crate::error::RelayError;
use crate::registry::Registry;
use crate::session::Session;
use crate::sink::DEFAULT_OUTBOUND_QUEUE;

/// Pause after a failed `accept` so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Longest client line accepted before the session is closed, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8 * 1024;

/// Per-session limits applied by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySettings {
    /// Capacity of each session's outbound queue.
    pub outbound_queue: usize,
    /// Close sessions that send nothing for this long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Longest accepted client line in bytes, terminator excluded.
    pub max_line_length: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            idle_timeout: None,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Hook for reporting session activity outside the log.
///
/// The binary prints these to the operator console; the default methods do
/// nothing.
pub trait RelayEvents: Send + Sync {
    /// A client finished the handshake as `name`.
    fn connected(&self, _timestamp: &str, _name: &str) {}

    /// A client connection ended. `name` is `None` before the handshake.
    fn disconnected(&self, _timestamp: &str, _name: Option<&str>) {}

    /// A public message was relayed; `line` is the broadcast text.
    fn public_message(&self, _line: &str) {}
}

/// [`RelayEvents`] that reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentEvents;

impl RelayEvents for SilentEvents {}

/// Shared relay state holding the name registry.
pub struct RelayState {
    /// Display name to session mapping.
    pub registry: Registry,
    settings: RelaySettings,
    events: Arc<dyn RelayEvents>,
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayState {
    /// Creates a relay state with default settings and no event reporting.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(RelaySettings::default())
    }

    /// Creates a relay state with custom per-session settings.
    #[must_use]
    pub fn with_settings(settings: RelaySettings) -> Self {
        Self {
            registry: Registry::new(),
            settings,
            events: Arc::new(SilentEvents),
        }
    }

    /// Replaces the event hook.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn RelayEvents>) -> Self {
        self.events = events;
        self
    }

    /// Per-session settings.
    #[must_use]
    pub const fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Event hook.
    #[must_use]
    pub fn events(&self) -> &dyn RelayEvents {
        self.events.as_ref()
    }
}

/// Starts the relay on `addr` with fresh default state.
///
/// # Errors
///
/// Returns [`RelayError::Bind`] if the TCP listener cannot bind.
pub async fn start_server(
    addr: &str,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), RelayError> {
    start_server_with_state(addr, Arc::new(RelayState::new())).await
}

/// Starts the relay on `addr` with a pre-configured [`RelayState`].
///
/// Returns the bound address and the handle of the accept loop, which runs
/// until aborted.
///
/// # Errors
///
/// Returns [`RelayError::Bind`] if the TCP listener cannot bind.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<RelayState>,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), RelayError> {
    let bind_err = |source| RelayError::Bind {
        addr: addr.to_string(),
        source,
    };
    let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
    let bound_addr = listener.local_addr().map_err(bind_err)?;

    let handle = tokio::spawn(accept_loop(listener, state));

    Ok((bound_addr, handle))
}

async fn accept_loop(listener: TcpListener, state: Arc<RelayState>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => spawn_session(stream, peer, &state),
            Err(e) => {
                tracing::warn!(error = %e, "failed to accept connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

fn spawn_session(stream: TcpStream, peer: SocketAddr, state: &Arc<RelayState>) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        let session = Session::new(state, Some(peer));
        let id = session.id();
        tracing::debug!(%peer, session = %id, "connection accepted");

        let (reader, writer) = stream.into_split();
        let end = session.run(reader, writer).await;
        tracing::debug!(%peer, session = %id, ?end, "connection closed");
    });
}
