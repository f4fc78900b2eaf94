//! One stream connection from handshake to teardown.
//!
//! The connection lifecycle:
//! 1. Send the welcome banner and name prompt, read one line as the name.
//! 2. Send the greeting, register the name and broadcast the arrival.
//! 3. Read lines until end of stream, dispatching public and private
//!    messages.
//! 4. Unregister and broadcast the departure, whatever ended step 3.
//!
//! Reading happens here; writing goes through the session's [`Sink`] and
//! its writer task. Failures end this session only.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use linechat_proto::command::Command;
use linechat_proto::identity::{resolve_name, timestamp_now};
use linechat_proto::line;
use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use crate::broadcast::broadcast;
use crate::registry::{SessionHandle, SessionId};
use crate::relay::RelayState;
use crate::sink::{self, Delivery, Sink, SinkClosed};

/// How long the writer may keep flushing after the session has ended.
const WRITER_GRACE: Duration = Duration::from_secs(2);

/// Client lines, decoded as UTF-8 and capped in length.
type LineReader<R> = FramedRead<R, LinesCodec>;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the client to send its name.
    Handshaking,
    /// Registered and relaying messages.
    Active,
    /// Leaving the registry.
    Closing,
    /// Terminal.
    Closed,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client closed its side of the stream.
    PeerClosed,
    /// Another connection registered the same name.
    Evicted,
    /// Nothing was received within the configured idle timeout.
    IdleTimeout,
    /// The outbound writer stopped, usually because the peer went away.
    WriterClosed,
    /// Reading from the connection failed or a line was not valid UTF-8.
    ReadFailed,
    /// The client sent a line longer than the configured maximum.
    LineTooLong,
}

enum Inbound {
    Line(String),
    Eof,
    Idle,
}

/// A single client connection.
pub struct Session {
    id: SessionId,
    peer: Option<SocketAddr>,
    relay: Arc<RelayState>,
    state: SessionState,
    name: Option<String>,
    handle: Option<SessionHandle>,
}

impl Session {
    /// Creates a session for a freshly accepted connection.
    #[must_use]
    pub fn new(relay: Arc<RelayState>, peer: Option<SocketAddr>) -> Self {
        Self {
            id: SessionId::new(),
            peer,
            relay,
            state: SessionState::Handshaking,
            name: None,
            handle: None,
        }
    }

    /// Identifier of this session.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Runs the session to completion over the two halves of a connection.
    ///
    /// Teardown always runs, however the read loop ends.
    pub async fn run<R, W>(mut self, reader: R, writer: W) -> SessionEnd
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let settings = *self.relay.settings();
        let (sink, rx) = Sink::channel(settings.outbound_queue);
        let mut write_task = sink::spawn_writer(writer, rx);
        let mut lines = FramedRead::new(
            reader,
            LinesCodec::new_with_max_length(settings.max_line_length),
        );

        let end = match self.serve(&mut lines, &sink).await {
            Ok(end) => end,
            Err(SinkClosed) => SessionEnd::WriterClosed,
        };
        tracing::debug!(session = %self.id, peer = ?self.peer, ?end, "session loop ended");

        self.teardown();
        drop(sink);

        if tokio::time::timeout(WRITER_GRACE, &mut write_task)
            .await
            .is_err()
        {
            tracing::debug!(session = %self.id, "writer still busy after grace period, aborting");
            write_task.abort();
        }

        end
    }

    async fn serve<R>(&mut self, lines: &mut LineReader<R>, sink: &Sink) -> Result<SessionEnd, SinkClosed>
    where
        R: AsyncRead + Unpin,
    {
        let idle = self.relay.settings().idle_timeout;

        sink.send(line::WELCOME).await?;
        sink.send(line::NAME_PROMPT).await?;

        let candidate = match read_line(lines, idle).await {
            Ok(Inbound::Line(candidate)) => candidate,
            Ok(Inbound::Eof) => return Ok(SessionEnd::PeerClosed),
            Ok(Inbound::Idle) => return self.close_idle(sink, idle).await,
            Err(e) => return self.read_failed(e, sink).await,
        };

        let name = resolve_name(&candidate);
        for greeting in line::greeting_lines(&name) {
            sink.send(greeting).await?;
        }

        let handle = self.register(&name, sink);

        loop {
            let inbound = tokio::select! {
                () = handle.evicted() => {
                    let _ = sink.offer(line::evicted_line(&name));
                    return Ok(SessionEnd::Evicted);
                }
                () = sink.closed() => return Ok(SessionEnd::WriterClosed),
                inbound = read_line(lines, idle) => inbound,
            };

            match inbound {
                Ok(Inbound::Line(text)) => self.dispatch(&name, &text, sink).await?,
                Ok(Inbound::Eof) => return Ok(SessionEnd::PeerClosed),
                Ok(Inbound::Idle) => return self.close_idle(sink, idle).await,
                Err(e) => return self.read_failed(e, sink).await,
            }
        }
    }

    fn register(&mut self, name: &str, sink: &Sink) -> SessionHandle {
        let handle = SessionHandle::new(self.id, sink.clone());
        self.relay.registry.register(name, handle.clone());
        self.name = Some(name.to_string());
        self.handle = Some(handle.clone());
        self.transition(SessionState::Active);

        let timestamp = timestamp_now();
        tracing::info!(session = %self.id, peer = ?self.peer, name, "client joined");
        self.relay.events().connected(&timestamp, name);
        broadcast(&self.relay.registry, &line::joined_line(&timestamp, name));

        handle
    }

    async fn dispatch(&self, name: &str, text: &str, sink: &Sink) -> Result<(), SinkClosed> {
        match Command::parse(text) {
            Command::Public(text) => self.send_public(name, text, sink).await,
            Command::Private { target, body } => self.send_private(name, target, body, sink).await,
            Command::Malformed => {
                tracing::trace!(session = %self.id, "dropping malformed private command");
                Ok(())
            }
        }
    }

    async fn send_public(&self, name: &str, text: &str, sink: &Sink) -> Result<(), SinkClosed> {
        let chat = line::chat_line(&timestamp_now(), name, text);
        tracing::info!(from = %name, message = %text, "public message");
        self.relay.events().public_message(&chat);

        sink.send(line::echo_line(&chat)).await?;
        let report = broadcast(&self.relay.registry, &chat);
        tracing::debug!(from = %name, delivered = report.delivered, dropped = report.dropped, "public message broadcast");
        Ok(())
    }

    async fn send_private(
        &self,
        name: &str,
        target: &str,
        body: &str,
        sink: &Sink,
    ) -> Result<(), SinkClosed> {
        let Some(dest) = self.relay.registry.lookup(target) else {
            tracing::debug!(from = %name, to = %target, "private message target not found");
            return sink.send(line::not_found_line(target)).await;
        };

        match dest.offer(line::private_line(name, body)) {
            Delivery::Queued => {
                tracing::info!(from = %name, to = %target, message = %body, "private message delivered");
            }
            delivery => {
                tracing::debug!(from = %name, to = %target, ?delivery, "private message dropped");
            }
        }
        Ok(())
    }

    async fn close_idle(&self, sink: &Sink, idle: Option<Duration>) -> Result<SessionEnd, SinkClosed> {
        let secs = idle.map_or(0, |d| d.as_secs());
        tracing::info!(session = %self.id, name = ?self.name, secs, "closing idle session");
        sink.send(line::idle_line(secs)).await?;
        Ok(SessionEnd::IdleTimeout)
    }

    async fn read_failed(&self, error: LinesCodecError, sink: &Sink) -> Result<SessionEnd, SinkClosed> {
        match error {
            LinesCodecError::MaxLineLengthExceeded => {
                let max = self.relay.settings().max_line_length;
                tracing::warn!(session = %self.id, name = ?self.name, max, "line too long, closing session");
                sink.send(line::too_long_line(max)).await?;
                Ok(SessionEnd::LineTooLong)
            }
            LinesCodecError::Io(e) => {
                tracing::warn!(session = %self.id, name = ?self.name, error = %e, "read failed");
                Ok(SessionEnd::ReadFailed)
            }
        }
    }

    fn teardown(&mut self) {
        self.transition(SessionState::Closing);
        let timestamp = timestamp_now();

        match (&self.name, &self.handle) {
            (Some(name), Some(handle)) => {
                let removed = self.relay.registry.unregister(name, handle.id());
                tracing::info!(session = %self.id, peer = ?self.peer, name = %name, "client disconnected");
                self.relay.events().disconnected(&timestamp, Some(name));
                if removed {
                    broadcast(&self.relay.registry, &line::left_line(&timestamp, name));
                }
            }
            _ => {
                tracing::warn!(session = %self.id, peer = ?self.peer, "unnamed client disconnected");
                self.relay.events().disconnected(&timestamp, None);
            }
        }

        self.handle = None;
        self.transition(SessionState::Closed);
    }

    fn transition(&mut self, next: SessionState) {
        tracing::trace!(session = %self.id, from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}

async fn read_line<R>(lines: &mut LineReader<R>, idle: Option<Duration>) -> Result<Inbound, LinesCodecError>
where
    R: AsyncRead + Unpin,
{
    let next = match idle {
        Some(limit) => match tokio::time::timeout(limit, lines.next()).await {
            Ok(next) => next,
            Err(_) => return Ok(Inbound::Idle),
        },
        None => lines.next().await,
    };
    Ok(next.transpose()?.map_or(Inbound::Eof, Inbound::Line))
}
