//! The live streaming loop: pull frames from a [`FrameSource`], encode
//! them, and push them over a chunked transport at a target frame rate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::codec::PolarEncoder;
use crate::error::{Error, Result, TransportError};
use crate::pipeline::source::FrameSource;
use crate::transport::MIN_PACKET_GAP;

/// Chunk size used to frame one encoded polar payload across multiple
/// sends, and the 4-byte (index, length) prefix ahead of each chunk.
pub const STREAM_CHUNK_SIZE: usize = 1024;

/// How long a single chunk send may take before counting as a timeout.
pub const CHUNK_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Consecutive per-frame send timeouts after which the session gives up
/// rather than continuing to drop frames indefinitely: repeated failure is
/// treated as fatal, not retried forever.
pub const MAX_CONSECUTIVE_TIMEOUTS: u8 = 3;

/// Tunables for one streaming session.
#[derive(Clone, Copy, Debug)]
pub struct StreamConfig {
    /// Target frames per second; frame pacing is derived from this.
    pub target_fps: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { target_fps: 10.0 }
    }
}

/// How a streaming session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    /// [`stop`](StreamSession::stop) was signalled and honoured between
    /// frames.
    Stopped,
    /// The source ran out of frames on its own.
    EndOfStream,
}

/// Drives one streaming session: pulls frames from `source`, encodes them,
/// and writes them to `sink` as a sequence of chunks. Cancellation via
/// [`StreamSession::stop_handle`] is checked only between frames, so a
/// chunk send in flight always completes before the loop exits.
pub struct StreamSession<W, F> {
    sink: W,
    source: F,
    encoder: Arc<PolarEncoder>,
    config: StreamConfig,
    stop: Arc<AtomicBool>,
}

impl<W, F> StreamSession<W, F>
where
    W: tokio::io::AsyncWrite + Unpin,
    F: FrameSource,
{
    /// Build a session writing chunked frames to `sink`, reading from
    /// `source`, encoding with `encoder`, at `config`'s target rate.
    pub fn new(sink: W, source: F, encoder: Arc<PolarEncoder>, config: StreamConfig) -> Self {
        Self {
            sink,
            source,
            encoder,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A clonable handle that, when flagged, stops the session after its
    /// current frame finishes sending.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run until the source is exhausted, the stop handle fires, or a
    /// fatal transport error accumulates (three consecutive per-frame
    /// send timeouts).
    pub async fn run(&mut self) -> Result<StreamOutcome> {
        let frame_interval = Duration::from_secs_f64(1.0 / self.config.target_fps);
        let mut next_tick = Instant::now();
        let mut consecutive_timeouts = 0u8;
        let mut frames_sent = 0u64;

        loop {
            if self.stop.load(Ordering::Acquire) {
                debug!(frames_sent, "stream stopped");
                return Ok(StreamOutcome::Stopped);
            }

            let Some(frame) = self.source.next_frame().await else {
                debug!(frames_sent, "stream reached end of source");
                return Ok(StreamOutcome::EndOfStream);
            };
            let polar = self.encoder.encode_frame(&frame)?;

            match tokio::time::timeout(CHUNK_SEND_TIMEOUT, self.send_frame(polar.as_bytes())).await
            {
                Ok(Ok(())) => {
                    consecutive_timeouts = 0;
                    frames_sent += 1;
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    consecutive_timeouts += 1;
                    warn!(consecutive_timeouts, "frame send timed out, dropping frame");
                    if consecutive_timeouts >= MAX_CONSECUTIVE_TIMEOUTS {
                        return Err(Error::Transport(TransportError::Timeout));
                    }
                    continue;
                }
            }

            // Drop accumulated pacing debt instead of bursting to catch up:
            // a slow frame should not be followed by several fast ones.
            next_tick += frame_interval;
            let now = Instant::now();
            if next_tick > now {
                tokio::time::sleep(next_tick - now).await;
            } else {
                next_tick = now;
            }
        }
    }

    async fn send_frame(&mut self, polar: &[u8]) -> Result<()> {
        use crate::transport::packet::{TAG_DATA, UPLOAD_HEADER, UPLOAD_TRAILER};

        let chunks: Vec<&[u8]> = polar.chunks(STREAM_CHUNK_SIZE).collect();
        let gap = MIN_PACKET_GAP
            .checked_div(u32::try_from(chunks.len().max(1)).unwrap_or(1))
            .unwrap_or(Duration::ZERO);
        for (index, chunk) in chunks.iter().enumerate() {
            let mut packet = Vec::with_capacity(
                UPLOAD_HEADER.len() + TAG_DATA.len() + 4 + chunk.len() + UPLOAD_TRAILER.len(),
            );
            packet.extend_from_slice(&UPLOAD_HEADER);
            packet.extend_from_slice(&TAG_DATA);
            packet.extend_from_slice(&(index as u16).to_le_bytes());
            packet.extend_from_slice(&(chunk.len() as u16).to_le_bytes());
            packet.extend_from_slice(chunk);
            packet.extend_from_slice(&UPLOAD_TRAILER);
            self.sink.write_all(&packet).await?;
            tokio::time::sleep(gap).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{PixelOrder, RasterFrame};
    use crate::pipeline::source::FixedFrameSource;
    use bytes::Bytes;
    use tokio::io::AsyncReadExt;

    fn solid_frame(side: u32, value: u8) -> RasterFrame {
        RasterFrame::new(
            side,
            PixelOrder::Rgb,
            Bytes::from(vec![value; (side * side * 3) as usize]),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn streams_every_frame_then_reports_end_of_stream() {
        let (sink, mut drain) = tokio::io::duplex(1 << 20);
        let encoder = Arc::new(PolarEncoder::new(32, 16, 16));
        let source = FixedFrameSource::new(vec![solid_frame(16, 0), solid_frame(16, 255)]);
        let mut session = StreamSession::new(
            sink,
            source,
            encoder,
            StreamConfig {
                target_fps: 1000.0,
            },
        );

        let run = tokio::spawn(async move { session.run().await });
        let mut received = Vec::new();
        // give the writer a moment to finish, then read whatever is queued
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = tokio::time::timeout(
            Duration::from_millis(50),
            drain.read_to_end(&mut received),
        )
        .await;

        let outcome = run.await.unwrap().unwrap();
        assert_eq!(outcome, StreamOutcome::EndOfStream);
        assert!(!received.is_empty());
    }

    #[tokio::test]
    async fn streamed_chunks_are_wrapped_in_data_framing() {
        use crate::transport::packet::{TAG_DATA, UPLOAD_HEADER, UPLOAD_TRAILER};

        let (sink, mut drain) = tokio::io::duplex(1 << 20);
        let encoder = Arc::new(PolarEncoder::new(32, 16, 16));
        let source = FixedFrameSource::new(vec![solid_frame(16, 128)]);
        let mut session = StreamSession::new(
            sink,
            source,
            encoder,
            StreamConfig {
                target_fps: 1000.0,
            },
        );

        let run = tokio::spawn(async move { session.run().await });
        let mut received = Vec::new();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = tokio::time::timeout(
            Duration::from_millis(50),
            drain.read_to_end(&mut received),
        )
        .await;
        run.await.unwrap().unwrap();

        assert_eq!(&received[0..UPLOAD_HEADER.len()], &UPLOAD_HEADER);
        let tag_start = UPLOAD_HEADER.len();
        assert_eq!(&received[tag_start..tag_start + TAG_DATA.len()], &TAG_DATA);
        let len_start = tag_start + TAG_DATA.len() + 2;
        let chunk_len =
            u16::from_le_bytes([received[len_start], received[len_start + 1]]) as usize;
        let trailer_start = len_start + 2 + chunk_len;
        assert_eq!(
            &received[trailer_start..trailer_start + UPLOAD_TRAILER.len()],
            &UPLOAD_TRAILER
        );
    }

    #[tokio::test]
    async fn stop_handle_halts_between_frames() {
        let (sink, _drain) = tokio::io::duplex(1 << 20);
        let encoder = Arc::new(PolarEncoder::new(32, 16, 16));
        let frames: Vec<_> = (0..50).map(|_| solid_frame(16, 1)).collect();
        let source = FixedFrameSource::new(frames);
        let mut session = StreamSession::new(
            sink,
            source,
            encoder,
            StreamConfig { target_fps: 50.0 },
        );
        let stop = session.stop_handle();
        let run = tokio::spawn(async move { session.run().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.store(true, Ordering::Release);
        let outcome = run.await.unwrap().unwrap();
        assert_eq!(outcome, StreamOutcome::Stopped);
    }
}
