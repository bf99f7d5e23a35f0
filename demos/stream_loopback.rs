//! Streams a handful of synthetic frames to an in-process TCP listener,
//! standing in for a fan, and reports how many bytes arrived.
//!
//! Run with: `cargo run --example stream-loopback --features locking-default`

use std::sync::Arc;

use holofan::codec::{PixelOrder, PolarEncoder, RasterFrame};
use holofan::pipeline::{FixedFrameSource, StreamConfig, StreamSession};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

fn solid_frame(side: u32, rgb: [u8; 3]) -> RasterFrame {
    let mut data = vec![0u8; side as usize * side as usize * 3];
    for px in data.chunks_mut(3) {
        px.copy_from_slice(&rgb);
    }
    RasterFrame::new(side, PixelOrder::Rgb, data).unwrap()
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let received = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        socket.read_to_end(&mut buf).await.unwrap();
        buf.len()
    });

    let sink = TcpStream::connect(addr).await?;
    let side = 32;
    let encoder = Arc::new(PolarEncoder::new(360, 32, side));
    let frames = vec![
        solid_frame(side, [255, 0, 0]),
        solid_frame(side, [0, 255, 0]),
        solid_frame(side, [0, 0, 255]),
    ];
    let source = FixedFrameSource::new(frames);
    let mut session = StreamSession::new(
        sink,
        source,
        encoder,
        StreamConfig { target_fps: 20.0 },
    );
    session.run().await.expect("loopback stream should not fail");

    let total_bytes = received.await.unwrap();
    println!("fan stand-in received {total_bytes} bytes");
    Ok(())
}
