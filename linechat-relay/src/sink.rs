//! Per-session outbound queue and its writer task.
//!
//! Every session owns a bounded queue of lines. A dedicated writer task
//! drains it onto the connection, so a stalled client only ever blocks its
//! own writer. Other sessions reach it through [`Sink::offer`], which never
//! waits: when the queue is full the line is rejected for that destination.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default number of lines buffered per session.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 256;

/// Result of a non-blocking [`Sink::offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The line was queued for the writer.
    Queued,
    /// The queue was full; the line was dropped.
    Full,
    /// The writer is gone; the line was dropped.
    Closed,
}

/// The writer of this sink has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("outbound writer closed")]
pub struct SinkClosed;

/// Write-only handle to one connection's outbound line queue.
#[derive(Debug, Clone)]
pub struct Sink {
    tx: mpsc::Sender<String>,
}

impl Sink {
    /// Creates a sink and the receiver its writer drains.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queues a line without waiting.
    pub fn offer(&self, line: impl Into<String>) -> Delivery {
        match self.tx.try_send(line.into()) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Queues a line, waiting for room in the queue.
    ///
    /// Used by a session for its own replies so they are never dropped.
    pub async fn send(&self, line: impl Into<String>) -> Result<(), SinkClosed> {
        self.tx.send(line.into()).await.map_err(|_| SinkClosed)
    }

    /// Resolves once the writer has stopped.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    /// Returns `true` if the writer has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawns the writer task draining `rx` onto `writer`.
///
/// Each line is followed by `\n` and a flush. The task ends when every
/// [`Sink`] clone is dropped or a write fails.
pub fn spawn_writer<W>(writer: W, rx: mpsc::Receiver<String>) -> JoinHandle<std::io::Result<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(write_lines(writer, rx))
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::Receiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}
