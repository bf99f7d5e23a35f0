//! End-to-end control-command exchange over a real loopback TCP socket.

use holofan::transport::{ControlCommand, ControlResponse, Fan};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[tokio::test]
async fn play_is_fire_and_forget() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 64];
        socket.read(&mut buf).await.unwrap()
    });

    let fan = Fan::with_ports(addr.ip(), addr.port(), addr.port());
    let response = fan.control(ControlCommand::Play).await.unwrap();
    assert_eq!(response, ControlResponse::Acknowledged);
    assert!(server.await.unwrap() > 0);
}

#[tokio::test]
async fn status_returns_the_fans_reply() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 64];
        socket.read(&mut buf).await.unwrap();
        socket.write_all(b"running").await.unwrap();
    });

    let fan = Fan::with_ports(addr.ip(), addr.port(), addr.port());
    let response = fan.control(ControlCommand::Status).await.unwrap();
    assert_eq!(response, ControlResponse::Status(b"running".to_vec()));
    server.await.unwrap();
}
