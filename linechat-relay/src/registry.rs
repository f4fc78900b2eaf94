//! Name registry shared by every session.
//!
//! Maps a display name (case-sensitive) to the [`SessionHandle`] of the
//! session that currently owns it. All mutation goes through a single
//! [`RwLock`]; no lock is held across an `.await` or any socket I/O. Fan-out
//! callers take a [`Registry::snapshot`] and write after the lock is gone.
//!
//! # Name collisions
//!
//! Registering a name that is already held replaces the previous holder and
//! fires its eviction signal. The evicted session closes its own connection
//! and, because the name now belongs to its successor, leaves the entry
//! alone on teardown.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::sink::Sink;

/// Identifier of one accepted connection, time-ordered (UUID v7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the registry stores for a registered session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    sink: Sink,
    evicted: Arc<Notify>,
}

impl SessionHandle {
    /// Creates a handle for the session `id` writing through `sink`.
    #[must_use]
    pub fn new(id: SessionId, sink: Sink) -> Self {
        Self {
            id,
            sink,
            evicted: Arc::new(Notify::new()),
        }
    }

    /// The owning session.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Outbound queue of the owning session.
    #[must_use]
    pub const fn sink(&self) -> &Sink {
        &self.sink
    }

    /// Signals the owning session that its name was taken over.
    ///
    /// The signal is latched: a session that starts waiting afterwards
    /// still observes it.
    pub fn evict(&self) {
        self.evicted.notify_one();
    }

    /// Resolves once [`SessionHandle::evict`] has been called.
    pub async fn evicted(&self) {
        self.evicted.notified().await;
    }
}

/// Concurrency-safe mapping from display name to session.
#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<HashMap<String, SessionHandle>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handle` under `name`.
    ///
    /// If another session held the name it is evicted and returned.
    pub fn register(&self, name: &str, handle: SessionHandle) -> Option<SessionHandle> {
        let previous = self.entries.write().insert(name.to_string(), handle);
        if let Some(prev) = &previous {
            tracing::info!(name, evicted = %prev.id(), "name taken over by a new session");
            prev.evict();
        }
        previous
    }

    /// Removes `name` if it is still owned by session `id`.
    ///
    /// Returns `true` when an entry was removed. Calling it again, or after
    /// the name moved to another session, is a no-op.
    pub fn unregister(&self, name: &str, id: SessionId) -> bool {
        let mut entries = self.entries.write();
        if entries.get(name).is_some_and(|h| h.id == id) {
            entries.remove(name);
            true
        } else {
            false
        }
    }

    /// Point-in-time copy of every `(name, sink)` pair, ordered by name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, Sink)> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(name, handle)| (name.clone(), handle.sink.clone()))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Returns the sink registered under `name`, if any.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Sink> {
        self.entries.read().get(name).map(|h| h.sink.clone())
    }

    /// Returns the id of the session owning `name`, if any.
    #[must_use]
    pub fn owner(&self, name: &str) -> Option<SessionId> {
        self.entries.read().get(name).map(SessionHandle::id)
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entries.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` when no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
