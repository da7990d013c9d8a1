//! Integration tests for the TCP transport.
//!
//! These tests spin up a real listener on an OS-assigned port and talk to
//! it with a plain `TcpStream`, so the bytes on the wire are exactly what
//! a game client would send.

use std::sync::Arc;

use clanforge_transport::{Connection, Frame, TcpTransport, Transport, TransportError};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Helper: binds a transport and returns it with its address.
async fn bind() -> (TcpTransport, String) {
    let transport = TcpTransport::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = transport.local_addr().expect("bound address").to_string();
    (transport, addr)
}

/// Helper: accepts one server-side connection and a matching client socket.
async fn pair() -> (clanforge_transport::TcpConnection, TcpStream) {
    let (mut transport, addr) = bind().await;
    let server = tokio::spawn(async move { transport.accept().await.expect("should accept") });
    let client = TcpStream::connect(&addr).await.expect("client should connect");
    let conn = server.await.expect("task should complete");
    (conn, client)
}

#[tokio::test]
async fn test_tcp_recv_frame_written_by_client() {
    let (conn, mut client) = pair().await;

    let bytes = Frame::new(1, br#"{"playerId":"p1"}"#.to_vec())
        .encode()
        .unwrap();
    // Split the write so the header arrives in pieces.
    client.write_all(&bytes[..3]).await.unwrap();
    client.flush().await.unwrap();
    client.write_all(&bytes[3..]).await.unwrap();

    let frame = conn.recv().await.unwrap().expect("a frame");
    assert_eq!(frame.kind, 1);
    assert_eq!(frame.body, br#"{"playerId":"p1"}"#.to_vec());
}

#[tokio::test]
async fn test_tcp_send_frame_reaches_client() {
    let (conn, mut client) = pair().await;

    conn.send(&Frame::new(41, b"hello".to_vec())).await.unwrap();

    let frame = Frame::read_from(&mut client, 1024).await.unwrap().unwrap();
    assert_eq!(frame, Frame::new(41, b"hello".to_vec()));
}

#[tokio::test]
async fn test_tcp_client_close_on_boundary_returns_none() {
    let (conn, client) = pair().await;
    drop(client);
    assert!(conn.recv().await.unwrap().is_none());
}

#[tokio::test]
async fn test_tcp_client_close_mid_frame_is_error() {
    let (conn, mut client) = pair().await;
    client.write_all(&[0, 0, 0, 2, 0, 0, 0, 10, 1, 2]).await.unwrap();
    drop(client);

    let err = conn.recv().await.unwrap_err();
    assert!(matches!(err, TransportError::ConnectionClosed(_)));
}

#[tokio::test]
async fn test_tcp_oversized_frame_is_rejected() {
    let (mut transport, addr) = bind().await;
    transport = transport.with_max_frame_len(16);
    let server = tokio::spawn(async move { transport.accept().await.unwrap() });
    let mut client = TcpStream::connect(&addr).await.unwrap();
    let conn = server.await.unwrap();

    client.write_all(&[0, 0, 0, 2, 0, 0, 0, 17]).await.unwrap();
    let err = conn.recv().await.unwrap_err();
    assert!(matches!(err, TransportError::FrameTooLarge { len: 17, max: 16 }));
}

#[tokio::test]
async fn test_tcp_concurrent_sends_do_not_interleave() {
    let (conn, mut client) = pair().await;
    let conn = Arc::new(conn);

    let mut tasks = Vec::new();
    for i in 0..8u8 {
        let conn = Arc::clone(&conn);
        tasks.push(tokio::spawn(async move {
            let body = vec![i; 64 * 1024];
            conn.send(&Frame::new(u32::from(i), body)).await.unwrap();
        }));
    }

    let mut seen = Vec::new();
    for _ in 0..8 {
        let frame = Frame::read_from(&mut client, 1 << 20).await.unwrap().unwrap();
        assert_eq!(frame.body.len(), 64 * 1024);
        assert!(frame.body.iter().all(|&b| u32::from(b) == frame.kind));
        seen.push(frame.kind);
    }
    for task in tasks {
        task.await.unwrap();
    }
    seen.sort_unstable();
    assert_eq!(seen, (0..8).collect::<Vec<u32>>());
}

#[tokio::test]
async fn test_tcp_connection_ids_are_unique() {
    let (mut transport, addr) = bind().await;
    let server = tokio::spawn(async move {
        let a = transport.accept().await.unwrap();
        let b = transport.accept().await.unwrap();
        (a.id(), b.id())
    });
    let _c1 = TcpStream::connect(&addr).await.unwrap();
    let _c2 = TcpStream::connect(&addr).await.unwrap();
    let (a, b) = server.await.unwrap();
    assert_ne!(a, b);
}
