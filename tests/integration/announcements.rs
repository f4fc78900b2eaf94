// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::future_not_send,
    clippy::missing_panics_doc
)]

//! Integration tests for the UDP announcement channel.
//!
//! The channel under test is bound on an ephemeral port; independent plain
//! UDP sockets play the part of remote peers.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use linechat_relay::announce::AnnouncementChannel;
use linechat_relay::console::{ChannelLines, ReaderLines};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

const RECV_TIMEOUT: Duration = Duration::from_secs(3);
const SILENCE: Duration = Duration::from_millis(300);

async fn peer() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = socket.local_addr().unwrap();
    (socket, addr)
}

async fn recv_text(socket: &UdpSocket) -> String {
    let mut buf = vec![0u8; 2048];
    let len = tokio::time::timeout(RECV_TIMEOUT, socket.recv(&mut buf))
        .await
        .expect("timed out waiting for a datagram")
        .unwrap();
    String::from_utf8(buf[..len].to_vec()).unwrap()
}

async fn assert_no_datagram(socket: &UdpSocket) {
    let mut buf = vec![0u8; 2048];
    let result = tokio::time::timeout(SILENCE, socket.recv(&mut buf)).await;
    assert!(result.is_err(), "unexpected datagram");
}

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

#[tokio::test]
async fn sent_announcement_arrives_as_timestamp_and_payload() {
    let (receiver, receiver_addr) = peer().await;
    let channel = AnnouncementChannel::bind(0, receiver_addr).unwrap();

    let mut source = ReaderLines::new("server restarting at 5\n".as_bytes());
    let sent = channel
        .run_sender_with(&mut source, || "2024-01-02 03:04:05".to_string())
        .await
        .unwrap();

    assert_eq!(sent, 1);
    assert_eq!(
        recv_text(&receiver).await,
        "2024-01-02 03:04:05 server restarting at 5"
    );
}

#[tokio::test]
async fn empty_operator_lines_send_nothing() {
    let (receiver, receiver_addr) = peer().await;
    let channel = AnnouncementChannel::bind(0, receiver_addr).unwrap();

    let mut source = ReaderLines::new("\n\n".as_bytes());
    let sent = channel
        .run_sender_with(&mut source, || "T".to_string())
        .await
        .unwrap();

    assert_eq!(sent, 0);
    assert_no_datagram(&receiver).await;
}

#[tokio::test]
async fn empty_lines_are_skipped_between_messages() {
    let (receiver, receiver_addr) = peer().await;
    let channel = AnnouncementChannel::bind(0, receiver_addr).unwrap();

    let (tx, mut source) = ChannelLines::channel(8);
    for line in ["", "first", "", "second"] {
        tx.send(line.to_string()).await.unwrap();
    }
    drop(tx);

    let sent = channel
        .run_sender_with(&mut source, || "T".to_string())
        .await
        .unwrap();

    assert_eq!(sent, 2);
    assert_eq!(recv_text(&receiver).await, "T first");
    assert_eq!(recv_text(&receiver).await, "T second");
}

#[tokio::test]
async fn receiver_reports_datagrams_and_never_replies() {
    let (unused, unused_addr) = peer().await;
    drop(unused);
    let channel = AnnouncementChannel::bind(0, unused_addr).unwrap();
    let port = channel.local_addr().unwrap().port();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = channel.spawn_receiver(move |line| {
        let _ = tx.send(line);
    });

    let (remote, _) = peer().await;
    remote.send_to(b"ping", loopback(port)).await.unwrap();
    remote.send_to(b"pong", loopback(port)).await.unwrap();

    let first = tokio::time::timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    let second = tokio::time::timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    assert!(first.ends_with(" UDP: ping"), "got {first:?}");
    assert!(second.ends_with(" UDP: pong"), "got {second:?}");

    assert_no_datagram(&remote).await;
    task.abort();
}

#[tokio::test]
async fn sender_and_receiver_share_one_socket() {
    // With the target pointing back at the channel's own port, the receiver
    // loop sees what the sender loop sends.
    let placeholder = AnnouncementChannel::bind(0, loopback(9)).unwrap();
    let port = placeholder.local_addr().unwrap().port();
    drop(placeholder);

    let channel = AnnouncementChannel::bind(port, loopback(port)).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = channel.spawn_receiver(move |line| {
        let _ = tx.send(line);
    });

    let mut source = ReaderLines::new("loop back\n".as_bytes());
    channel
        .run_sender_with(&mut source, || "T".to_string())
        .await
        .unwrap();

    let report = tokio::time::timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    assert!(report.ends_with(" UDP: T loop back"), "got {report:?}");
    task.abort();
}

#[tokio::test]
async fn port_can_be_shared_with_address_reuse() {
    let first = AnnouncementChannel::bind(0, loopback(9)).unwrap();
    let port = first.local_addr().unwrap().port();

    let second = AnnouncementChannel::bind(port, loopback(9));
    assert!(second.is_ok());
}
