//! Datagram announcement channel.
//!
//! One UDP socket with address reuse enabled, shared by two independent
//! loops: a receiver that reports every datagram and never replies, and a
//! sender that turns operator lines into timestamped datagrams. Neither loop
//! touches the relay registry.

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use linechat_proto::identity::timestamp_now;
use linechat_proto::line;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use crate::console::LineSource;
use crate::error::RelayError;

/// Largest datagram the receiver accepts.
const MAX_DATAGRAM: usize = 64 * 1024;

/// Pause after a failed receive so a persistent error does not spin.
const RECEIVE_BACKOFF: Duration = Duration::from_millis(100);

/// Where the receiver loop reads datagrams from.
trait DatagramSource {
    fn recv_datagram<'a>(
        &'a self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = std::io::Result<(usize, SocketAddr)>> + Send + 'a;
}

impl DatagramSource for UdpSocket {
    fn recv_datagram<'a>(
        &'a self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = std::io::Result<(usize, SocketAddr)>> + Send + 'a {
        self.recv_from(buf)
    }
}

/// The bound announcement socket and the address announcements go to.
#[derive(Debug, Clone)]
pub struct AnnouncementChannel {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
}

impl AnnouncementChannel {
    /// Binds `0.0.0.0:<port>` with `SO_REUSEADDR` and sends to `target`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::AnnounceSocket`] if the socket cannot be created
    /// or bound.
    pub fn bind(port: u16, target: SocketAddr) -> Result<Self, RelayError> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let socket = make_reusable_socket(addr)
            .and_then(UdpSocket::from_std)
            .map_err(|source| RelayError::AnnounceSocket { addr, source })?;

        tracing::debug!(%addr, %target, "announcement socket bound");

        Ok(Self {
            socket: Arc::new(socket),
            target,
        })
    }

    /// Local address of the socket.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the address cannot be read.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Where outgoing announcements are sent.
    #[must_use]
    pub const fn target(&self) -> SocketAddr {
        self.target
    }

    /// Spawns the receiver loop.
    ///
    /// Every datagram is decoded as lossy UTF-8, formatted as
    /// `<timestamp> UDP: <payload>`, logged, and passed to `on_receive`.
    /// The loop runs until the task is aborted.
    pub fn spawn_receiver<F>(&self, on_receive: F) -> JoinHandle<()>
    where
        F: FnMut(String) + Send + 'static,
    {
        tokio::spawn(receive_loop(Arc::clone(&self.socket), on_receive))
    }

    /// Runs the sender loop with wall-clock timestamps.
    ///
    /// # Errors
    ///
    /// Returns the error of `source` if reading operator input fails.
    pub async fn run_sender<S>(&self, source: &mut S) -> std::io::Result<usize>
    where
        S: LineSource,
    {
        self.run_sender_with(source, timestamp_now).await
    }

    /// Runs the sender loop, stamping each datagram with `stamp()`.
    ///
    /// Empty lines are skipped. Send failures are logged and the loop goes
    /// on. Returns the number of datagrams sent once `source` is exhausted.
    ///
    /// # Errors
    ///
    /// Returns the error of `source` if reading operator input fails.
    pub async fn run_sender_with<S, F>(&self, source: &mut S, stamp: F) -> std::io::Result<usize>
    where
        S: LineSource,
        F: Fn() -> String,
    {
        let mut sent = 0;

        while let Some(text) = source.next_line().await? {
            if text.is_empty() {
                continue;
            }

            let payload = line::announcement_line(&stamp(), &text);
            match self.socket.send_to(payload.as_bytes(), self.target).await {
                Ok(_) => {
                    sent += 1;
                    tracing::info!(to = %self.target, message = %payload, "announcement sent");
                }
                Err(e) => {
                    tracing::warn!(to = %self.target, error = %e, "announcement send failed");
                }
            }
        }

        Ok(sent)
    }
}

/// Resolves the announcement target from the configured host and port.
///
/// # Errors
///
/// Returns [`RelayError::Resolve`] if the host does not resolve.
pub async fn resolve_target(host: &str, port: u16) -> Result<SocketAddr, RelayError> {
    let resolve_err = |source| RelayError::Resolve {
        host: host.to_string(),
        port,
        source,
    };
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| resolve_err(Some(e)))?
        .next()
        .ok_or_else(|| resolve_err(None))
}

async fn receive_loop<S, F>(socket: Arc<S>, mut on_receive: F)
where
    S: DatagramSource + Send + Sync,
    F: FnMut(String) + Send,
{
    let mut buf = vec![0u8; MAX_DATAGRAM];

    tracing::info!("announcement receiver starting");

    loop {
        let (len, peer) = match socket.recv_datagram(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "announcement receive failed");
                tokio::time::sleep(RECEIVE_BACKOFF).await;
                continue;
            }
        };

        let payload = String::from_utf8_lossy(&buf[..len]);
        let report = line::received_announcement_line(&timestamp_now(), &payload);
        tracing::info!(%peer, message = %payload, "announcement received");
        on_receive(report);
    }
}

fn make_reusable_socket(addr: SocketAddr) -> std::io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}
