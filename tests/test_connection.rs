mod common;

use std::net::Shutdown;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use contentd::net::{BufferedConnection, ConnectionError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use common::{TempDir, socket_pair};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_open_rejects_zero_capacity() {
    let (server, _client) = socket_pair().await;

    let err = BufferedConnection::open(server, 0, 64).unwrap_err();

    assert!(matches!(err, ConnectionError::Allocation { capacity: 0 }));
}

#[tokio::test]
async fn test_open_records_peer() {
    let (server, client) = socket_pair().await;

    let conn = BufferedConnection::open(server, 64, 64).unwrap();

    assert_eq!(conn.peer_addr(), Some(client.local_addr().unwrap()));
}

#[tokio::test]
async fn test_send_preserves_order_across_flushes() {
    let (server, mut client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 16, 16).unwrap();
    let large = vec![b'L'; 40];

    assert_eq!(conn.send(b"abc").await.unwrap(), 3);
    assert_eq!(conn.send(b"defghijklmno").await.unwrap(), 12);
    // does not fit behind the 15 pending bytes
    assert_eq!(conn.send(b"pq").await.unwrap(), 2);
    // larger than the buffer, written directly
    assert_eq!(conn.send(&large).await.unwrap(), 40);
    assert_eq!(conn.send(b"xyz").await.unwrap(), 3);
    conn.flush().await.unwrap();
    conn.close(Shutdown::Both).await.unwrap();

    let mut received = Vec::new();
    client.read_to_end(&mut received).await.unwrap();

    let mut expected = b"abcdefghijklmnopq".to_vec();
    expected.extend_from_slice(&large);
    expected.extend_from_slice(b"xyz");
    assert_eq!(received, expected);
}

#[tokio::test]
async fn test_close_discards_unflushed_output() {
    let (server, mut client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 64, 64).unwrap();

    conn.send(b"sent").await.unwrap();
    conn.flush().await.unwrap();
    conn.send(b"lost").await.unwrap();
    conn.close(Shutdown::Both).await.unwrap();

    let mut received = Vec::new();
    client.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"sent");
}

#[tokio::test]
async fn test_receive_in_small_chunks() {
    let (server, mut client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 64, 64).unwrap();

    client.write_all(b"hello world").await.unwrap();

    let mut collected = Vec::new();
    while collected.len() < 11 {
        let mut chunk = [0u8; 5];
        let n = conn.receive(&mut chunk, TIMEOUT).await.unwrap();
        assert!(n > 0 && n <= 5);
        collected.extend_from_slice(&chunk[..n]);
    }
    assert_eq!(collected, b"hello world");
}

#[tokio::test]
async fn test_receive_larger_than_buffer() {
    let (server, mut client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 8, 8).unwrap();
    let payload: Vec<u8> = (0..100).collect();

    client.write_all(&payload).await.unwrap();
    client.shutdown().await.unwrap();

    let mut collected = Vec::new();
    loop {
        let mut chunk = [0u8; 32];
        let n = conn.receive(&mut chunk, TIMEOUT).await.unwrap();
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&chunk[..n]);
    }
    assert_eq!(collected, payload);
}

#[tokio::test]
async fn test_receive_empty_buffer_returns_zero() {
    let (server, _client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 8, 8).unwrap();

    assert_eq!(conn.receive(&mut [], TIMEOUT).await.unwrap(), 0);
}

#[tokio::test]
async fn test_receive_times_out() {
    let (server, _client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 8, 8).unwrap();
    let mut buf = [0u8; 4];

    let err = conn
        .receive(&mut buf, Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectionError::Timeout(_)));
}

#[tokio::test]
async fn test_receive_line_splits_on_crlf() {
    let (server, mut client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 64, 64).unwrap();

    client
        .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();

    let mut line = BytesMut::new();
    assert_eq!(conn.receive_line(&mut line, 64, TIMEOUT).await.unwrap(), 14);
    assert_eq!(&line[..], b"GET / HTTP/1.1");

    line.clear();
    assert_eq!(conn.receive_line(&mut line, 64, TIMEOUT).await.unwrap(), 7);
    assert_eq!(&line[..], b"Host: x");

    line.clear();
    assert_eq!(conn.receive_line(&mut line, 64, TIMEOUT).await.unwrap(), 0);
    assert!(line.is_empty());
}

#[tokio::test]
async fn test_receive_line_appends_to_existing_contents() {
    let (server, mut client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 64, 64).unwrap();

    client.write_all(b"second\r\n").await.unwrap();

    let mut line = BytesMut::from(&b"first|"[..]);
    assert_eq!(conn.receive_line(&mut line, 64, TIMEOUT).await.unwrap(), 6);
    assert_eq!(&line[..], b"first|second");
}

#[tokio::test]
async fn test_receive_line_bare_lf_is_content() {
    let (server, mut client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 64, 64).unwrap();

    client.write_all(b"a\nb\rc\r\n").await.unwrap();

    let mut line = BytesMut::new();
    conn.receive_line(&mut line, 64, TIMEOUT).await.unwrap();
    assert_eq!(&line[..], b"a\nb\rc");
}

#[tokio::test]
async fn test_receive_line_length_limit() {
    let (server, mut client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 64, 64).unwrap();

    // max 8 allows 7 bytes of content
    client.write_all(b"1234567\r\n12345678\r\n").await.unwrap();

    let mut line = BytesMut::new();
    assert_eq!(conn.receive_line(&mut line, 8, TIMEOUT).await.unwrap(), 7);

    let mut line = BytesMut::from(&b"kept"[..]);
    let err = conn.receive_line(&mut line, 8, TIMEOUT).await.unwrap_err();
    assert!(matches!(err, ConnectionError::LineTooLong { max: 8 }));
    assert_eq!(&line[..], b"kept");
}

#[tokio::test]
async fn test_receive_line_peer_closed_mid_line() {
    let (server, mut client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 64, 64).unwrap();

    client.write_all(b"partial").await.unwrap();
    client.shutdown().await.unwrap();

    let mut line = BytesMut::new();
    let err = conn.receive_line(&mut line, 64, TIMEOUT).await.unwrap_err();

    assert!(matches!(err, ConnectionError::Closed));
    assert!(line.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_receive_proceeds_while_send_is_blocked() {
    let (server, mut client) = socket_pair().await;
    let conn = Arc::new(BufferedConnection::open(server, 64, 64).unwrap());
    // far more than the loopback socket buffers hold
    let payload = vec![b'x'; 64 * 1024 * 1024];
    let total = payload.len();

    let sender = {
        let conn = Arc::clone(&conn);
        tokio::spawn(async move { conn.send(&payload).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.write_all(b"ping").await.unwrap();
    let mut received = Vec::new();
    while received.len() < 4 {
        let mut buf = [0u8; 4];
        let n = conn.receive(&mut buf, TIMEOUT).await.unwrap();
        assert!(n > 0);
        received.extend_from_slice(&buf[..n]);
    }
    assert_eq!(received, b"ping");
    assert!(!sender.is_finished());

    let mut sink = vec![0u8; total];
    client.read_exact(&mut sink).await.unwrap();
    assert_eq!(sender.await.unwrap().unwrap(), total);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_senders_take_turns() {
    let (server, mut client) = socket_pair().await;
    let conn = Arc::new(BufferedConnection::open(server, 16, 16).unwrap());
    let size = 1024 * 1024;

    let reader = tokio::spawn(async move {
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        received
    });

    let senders: Vec<_> = [b'a', b'b']
        .into_iter()
        .map(|fill| {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.send(&vec![fill; size]).await })
        })
        .collect();
    for sender in senders {
        assert_eq!(sender.await.unwrap().unwrap(), size);
    }

    let conn = Arc::try_unwrap(conn).unwrap();
    conn.close(Shutdown::Both).await.unwrap();

    let received = reader.await.unwrap();
    assert_eq!(received.len(), 2 * size);
    let (first, second) = received.split_at(size);
    assert!(first.iter().all(|&b| b == first[0]));
    assert!(second.iter().all(|&b| b == second[0]));
    assert_ne!(first[0], second[0]);
}

#[tokio::test]
async fn test_send_file_after_buffered_head() {
    let dir = TempDir::new("sendfile");
    let path = dir.write("body.txt", b"hello world");
    let (server, mut client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 64, 64).unwrap();

    conn.send(b"HEAD\r\n").await.unwrap();
    conn.send_file(&path, 5).await.unwrap();
    conn.close(Shutdown::Both).await.unwrap();

    let mut received = Vec::new();
    client.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"HEAD\r\nhello");
}

#[tokio::test]
async fn test_send_file_larger_than_socket_buffer() {
    let dir = TempDir::new("sendfile");
    let body: Vec<u8> = (0..4 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    let path = dir.write("big.bin", &body);
    let (server, mut client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 64, 64).unwrap();

    let reader = tokio::spawn(async move {
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        received
    });

    conn.send_file(&path, body.len() as u64).await.unwrap();
    conn.close(Shutdown::Both).await.unwrap();

    assert_eq!(reader.await.unwrap(), body);
}

#[tokio::test]
async fn test_send_file_short_file() {
    let dir = TempDir::new("sendfile");
    let path = dir.write("short.txt", b"abc");
    let (server, _client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 64, 64).unwrap();

    let err = conn.send_file(&path, 10).await.unwrap_err();

    assert!(matches!(err, ConnectionError::Io(_)));
}

#[tokio::test]
async fn test_send_file_missing() {
    let dir = TempDir::new("sendfile");
    let (server, _client) = socket_pair().await;
    let conn = BufferedConnection::open(server, 64, 64).unwrap();

    let err = conn
        .send_file(&dir.path().join("absent"), 1)
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectionError::Io(_)));
}
