//! The polar codec: maps a square RGB raster to
//! the fan's native `2700 x 42`-byte polar representation, and assembles one
//! or more encoded frames into a self-describing `.bin` container.

mod container;
mod encoder;
mod geometry;

pub use container::{ContainerKind, CONTAINER_HEADER_LEN, FRAME_PADDING_LEN};
pub use encoder::{PixelOrder, PolarEncoder, PolarFrame, RasterFrame};

use crate::error::{Error, Result};
use once_cell::sync::Lazy;

/// Hardware ray count of the target display.
pub const DEFAULT_N_RAYS: u32 = 2700;
/// Hardware LED count of the target display's strip.
pub const DEFAULT_N_LEDS: u32 = 224;
/// Conventional raster side length fed to the codec.
pub const DEFAULT_SIDE: u32 = 256;

static DEFAULT_ENCODER: Lazy<PolarEncoder> =
    Lazy::new(|| PolarEncoder::new(DEFAULT_N_RAYS, DEFAULT_N_LEDS, DEFAULT_SIDE));

/// Encode a single raster frame using the default encoder
/// (2700 rays, 224 LEDs, 256-pixel side).
///
/// See [`PolarEncoder::encode_frame`] for the full contract.
pub fn encode_frame(raster: &RasterFrame) -> Result<PolarFrame> {
    DEFAULT_ENCODER.encode_frame(raster)
}

/// Encode a sequence of raster frames into a complete `.bin` animation
/// container using the default encoder.
pub fn encode_animation(frames: &[RasterFrame]) -> Result<Vec<u8>> {
    if frames.is_empty() {
        return Err(Error::InvalidInput("no frames to encode".into()));
    }
    DEFAULT_ENCODER.encode_animation(frames)
}
