//! Frame sources: the pipeline is agnostic to where raster frames come
//! from (webcam capture, a WebRTC track, a canned test fixture) behind
//! this one trait.

use crate::codec::RasterFrame;

/// Something that produces a sequence of raster frames, one at a time.
/// `None` signals a clean end of stream, not an error.
pub trait FrameSource: Send {
    /// Produce the next frame, or `None` if the source is exhausted.
    fn next_frame(&mut self) -> impl std::future::Future<Output = Option<RasterFrame>> + Send;
}

/// A [`FrameSource`] over a fixed, in-memory sequence of frames. Useful for
/// tests and for one-shot still/animation uploads that don't need a live
/// capture device.
pub struct FixedFrameSource {
    frames: std::vec::IntoIter<RasterFrame>,
}

impl FixedFrameSource {
    /// Build a source that yields `frames` in order, then ends.
    pub fn new(frames: Vec<RasterFrame>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl FrameSource for FixedFrameSource {
    async fn next_frame(&mut self) -> Option<RasterFrame> {
        self.frames.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PixelOrder;
    use bytes::Bytes;

    fn black_frame(side: u32) -> RasterFrame {
        RasterFrame::new(side, PixelOrder::Rgb, Bytes::from(vec![0u8; (side * side * 3) as usize]))
            .unwrap()
    }

    #[tokio::test]
    async fn fixed_source_yields_frames_then_ends() {
        let mut source = FixedFrameSource::new(vec![black_frame(4), black_frame(4)]);
        assert!(source.next_frame().await.is_some());
        assert!(source.next_frame().await.is_some());
        assert!(source.next_frame().await.is_none());
    }
}
