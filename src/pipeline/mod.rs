//! The live streaming pipeline: source frames,
//! preprocess them, encode, and push them over a chunked transport at a
//! bounded rate.

mod preprocess;
mod source;
mod stream;

pub use preprocess::preprocess;
pub use source::{FixedFrameSource, FrameSource};
pub use stream::{
    StreamConfig, StreamOutcome, StreamSession, CHUNK_SEND_TIMEOUT, MAX_CONSECUTIVE_TIMEOUTS,
    STREAM_CHUNK_SIZE,
};
