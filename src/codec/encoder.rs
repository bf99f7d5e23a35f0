use bytes::Bytes;
use rayon::prelude::*;

use crate::codec::container::{build_header, ContainerKind, CONTAINER_HEADER_LEN, FRAME_PADDING_LEN};
use crate::codec::geometry::LookupTable;
use crate::dither::{ordered_dither, pack_bits_msb};
use crate::error::{Error, Result};

/// Channel order of a [`RasterFrame`]'s backing bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelOrder {
    /// Red, green, blue.
    Rgb,
    /// Blue, green, red (the OpenCV-conventional order the pipeline's
    /// webcam/WebRTC sources typically hand over).
    Bgr,
}

/// A square, 8-bit-per-channel raster frame, ready for the codec.
///
/// Cheap to clone: the pixel buffer is reference-counted.
#[derive(Clone, Debug)]
pub struct RasterFrame {
    side: u32,
    order: PixelOrder,
    data: Bytes,
}

impl RasterFrame {
    /// Build a frame from a tightly-packed `side * side * 3`-byte buffer.
    /// Returns [`Error::InvalidInput`] if the buffer length doesn't match
    /// `side * side * 3` or `side == 0`.
    pub fn new(side: u32, order: PixelOrder, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if side == 0 {
            return Err(Error::InvalidInput("raster side must be >= 1".into()));
        }
        let expected = side as usize * side as usize * 3;
        if data.len() != expected {
            return Err(Error::InvalidInput(format!(
                "raster buffer is {} bytes, expected {expected} for a {side}x{side} RGB/BGR frame",
                data.len()
            )));
        }
        Ok(Self { side, order, data })
    }

    /// Side length in pixels.
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Channel order of the backing buffer.
    pub fn order(&self) -> PixelOrder {
        self.order
    }

    /// Raw backing bytes, in `self.order()`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// RGB triple at pixel `(x, y)`, regardless of the frame's backing order.
    #[inline]
    fn pixel_rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.side as usize + x as usize) * 3;
        let px = &self.data[idx..idx + 3];
        match self.order {
            PixelOrder::Rgb => [px[0], px[1], px[2]],
            PixelOrder::Bgr => [px[2], px[1], px[0]],
        }
    }
}

/// One encoded frame: `n_rays * (n_leds/2) * 3 / 8` bytes, 113,400 at
/// defaults.
#[derive(Clone, Debug)]
pub struct PolarFrame {
    bytes: Bytes,
}

impl PolarFrame {
    /// Backing bytes of the encoded frame.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the frame is empty (never true for a frame produced by
    /// [`PolarEncoder::encode_frame`], present for API completeness).
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<PolarFrame> for Bytes {
    fn from(frame: PolarFrame) -> Self {
        frame.bytes
    }
}

/// Stateful polar encoder: owns the precomputed `(ray, led) -> pixel`
/// lookup table for one `(n_rays, n_leds, side)` triple.
///
/// Immutable after construction and safe to share (e.g. via `Arc`) across
/// threads or frame iterations.
#[derive(Debug)]
pub struct PolarEncoder {
    table: LookupTable,
    side: u32,
}

impl PolarEncoder {
    /// Build an encoder for `n_rays` angular rays, `n_leds` physical LEDs,
    /// over a `side x side` raster. The lookup table is computed once here.
    pub fn new(n_rays: u32, n_leds: u32, side: u32) -> Self {
        Self {
            table: LookupTable::build(n_rays, n_leds, side),
            side,
        }
    }

    /// Number of angular rays this encoder targets.
    pub fn n_rays(&self) -> u32 {
        self.table.n_rays()
    }

    /// Number of physical LEDs this encoder targets.
    pub fn n_leds(&self) -> u32 {
        self.table.n_leds()
    }

    /// Raster side this encoder expects.
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Byte length of one encoded frame.
    pub fn frame_len(&self) -> usize {
        self.n_rays() as usize * self.table.half_leds() as usize * 3 / 8
    }

    /// Encode one raster frame to its polar byte representation.
    ///
    /// Rays are encoded independently and may run in parallel;
    /// ordering in the output buffer is always preserved.
    pub fn encode_frame(&self, raster: &RasterFrame) -> Result<PolarFrame> {
        if raster.side() != self.side {
            return Err(Error::InvalidInput(format!(
                "raster side {} does not match encoder side {}",
                raster.side(),
                self.side
            )));
        }
        let half_leds = self.table.half_leds() as usize;
        let rays: Vec<Vec<u8>> = (0..self.n_rays())
            .into_par_iter()
            .map(|ray| self.encode_ray(raster, ray, half_leds))
            .collect();
        let mut out = Vec::with_capacity(self.frame_len());
        for ray_bytes in rays {
            out.extend_from_slice(&ray_bytes);
        }
        Ok(PolarFrame { bytes: out.into() })
    }

    fn encode_ray(&self, raster: &RasterFrame, ray: u32, half_leds: usize) -> Vec<u8> {
        let mut bits = Vec::with_capacity(half_leds * 3);
        for sample in self.table.ray(ray) {
            let [r, g, b] = bilinear_sample(raster, sample.x, sample.y);
            bits.push(ordered_dither(sample.x, sample.y, r));
            bits.push(ordered_dither(sample.x, sample.y, g));
            bits.push(ordered_dither(sample.x, sample.y, b));
        }
        pack_bits_msb(&bits)
    }

    /// Encode a sequence of frames into a complete `.bin` container. Exactly
    /// one frame produces a still (`kind = 0x01`); more than one produces an
    /// animation (`kind = 0x3C`). Frames are separated by
    /// [`FRAME_PADDING_LEN`] zero bytes.
    pub fn encode_animation(&self, frames: &[RasterFrame]) -> Result<Vec<u8>> {
        if frames.is_empty() {
            return Err(Error::InvalidInput("no frames to encode".into()));
        }
        let kind = ContainerKind::for_frame_count(frames.len());
        let mut out = Vec::with_capacity(
            CONTAINER_HEADER_LEN + frames.len() * (self.frame_len() + FRAME_PADDING_LEN),
        );
        out.extend_from_slice(&build_header(kind));
        for raster in frames {
            let encoded = self.encode_frame(raster)?;
            out.extend_from_slice(encoded.as_bytes());
            out.extend(std::iter::repeat(0u8).take(FRAME_PADDING_LEN));
        }
        Ok(out)
    }
}

/// Bilinear-sample the RGB triple at floating-point pixel coordinates
/// `(x, y)`. `rho <= 0.5` in the lookup table keeps samples strictly inside
/// the raster, so neighbour lookups never go out of range.
fn bilinear_sample(raster: &RasterFrame, x: f64, y: f64) -> [u8; 3] {
    let side = raster.side();
    let x0 = x.trunc() as i64;
    let y0 = y.trunc() as i64;
    let x0 = x0.clamp(0, i64::from(side) - 1) as u32;
    let y0 = y0.clamp(0, i64::from(side) - 1) as u32;
    let x1 = (x0 + 1).min(side - 1);
    let y1 = (y0 + 1).min(side - 1);
    let xd = x.fract().max(0.0);
    let yd = y.fract().max(0.0);

    let p00 = raster.pixel_rgb(x0, y0);
    let p01 = raster.pixel_rgb(x1, y0);
    let p10 = raster.pixel_rgb(x0, y1);
    let p11 = raster.pixel_rgb(x1, y1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let v = f64::from(p00[c]) * (1.0 - xd) * (1.0 - yd)
            + f64::from(p01[c]) * xd * (1.0 - yd)
            + f64::from(p10[c]) * (1.0 - xd) * yd
            + f64::from(p11[c]) * xd * yd;
        out[c] = v as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::container::CONTAINER_HEADER_LEN;

    fn solid_raster(side: u32, rgb: [u8; 3]) -> RasterFrame {
        let mut data = vec![0u8; side as usize * side as usize * 3];
        for px in data.chunks_mut(3) {
            px.copy_from_slice(&rgb);
        }
        RasterFrame::new(side, PixelOrder::Rgb, data).unwrap()
    }

    #[test]
    fn codec_determinism() {
        let encoder = PolarEncoder::new(64, 16, 32);
        let raster = solid_raster(32, [123, 45, 200]);
        let a = encoder.encode_frame(&raster).unwrap();
        let b = encoder.encode_frame(&raster).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn codec_shape_at_defaults() {
        let encoder = PolarEncoder::new(2700, 224, 256);
        assert_eq!(encoder.frame_len(), 113_400);
    }

    #[test]
    fn black_frame_is_all_zero() {
        let encoder = PolarEncoder::new(2700, 224, 256);
        let raster = solid_raster(256, [0, 0, 0]);
        let frame = encoder.encode_frame(&raster).unwrap();
        assert!(frame.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn white_frame_is_all_ff() {
        let encoder = PolarEncoder::new(2700, 224, 256);
        let raster = solid_raster(256, [255, 255, 255]);
        let frame = encoder.encode_frame(&raster).unwrap();
        assert!(frame.as_bytes().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn red_disc_repeats_100100_pattern() {
        let encoder = PolarEncoder::new(2700, 224, 256);
        let raster = solid_raster(256, [255, 0, 0]);
        let frame = encoder.encode_frame(&raster).unwrap();
        for chunk in frame.as_bytes().chunks(3) {
            if chunk.len() == 3 {
                assert_eq!(chunk, &[0x92, 0x49, 0x24]);
            }
        }
    }

    #[test]
    fn container_size_matches_formula() {
        let encoder = PolarEncoder::new(64, 16, 32);
        let frames = vec![solid_raster(32, [1, 2, 3]), solid_raster(32, [4, 5, 6])];
        let bin = encoder.encode_animation(&frames).unwrap();
        assert_eq!(
            bin.len(),
            CONTAINER_HEADER_LEN + frames.len() * (encoder.frame_len() + FRAME_PADDING_LEN)
        );
    }

    #[test]
    fn still_vs_animation_header_tag() {
        let encoder = PolarEncoder::new(32, 8, 16);
        let one = encoder
            .encode_animation(&[solid_raster(16, [9, 9, 9])])
            .unwrap();
        assert_eq!(one[3], 0x01);
        let two = encoder
            .encode_animation(&[solid_raster(16, [9, 9, 9]), solid_raster(16, [9, 9, 9])])
            .unwrap();
        assert_eq!(two[3], 0x3C);
    }

    #[test]
    fn angle_direction_second_half_of_rays_tracks_bottom_half_of_image() {
        // The sign of sin(phi(r)) alone decides whether a ray samples the
        // image's row < centre half or row >= centre half: rays in
        // [0, n/2) land in the former, rays in [n/2, n) in the latter
        // (the ray-index reversal makes this true — see geometry.rs). We light the
        // row >= centre half and leave the rest black, so a correct
        // (non-sign-flipped) implementation must report more set bits in
        // the second half of ray indices.
        let side = 64u32;
        let mut data = vec![0u8; side as usize * side as usize * 3];
        for y in 0..side {
            for x in 0..side {
                if y >= side / 2 {
                    let idx = (y as usize * side as usize + x as usize) * 3;
                    data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
                }
            }
        }
        let raster = RasterFrame::new(side, PixelOrder::Rgb, data).unwrap();
        let encoder = PolarEncoder::new(360, 32, side);
        let frame = encoder.encode_frame(&raster).unwrap();
        let bytes_per_ray = encoder.frame_len() / encoder.n_rays() as usize;
        let popcount = |bytes: &[u8]| -> u32 { bytes.iter().map(|b| b.count_ones()).sum() };
        let half = encoder.n_rays() as usize / 2;
        let first_half: u32 = (0..half)
            .map(|r| popcount(&frame.as_bytes()[r * bytes_per_ray..(r + 1) * bytes_per_ray]))
            .sum();
        let second_half: u32 = (half..encoder.n_rays() as usize)
            .map(|r| popcount(&frame.as_bytes()[r * bytes_per_ray..(r + 1) * bytes_per_ray]))
            .sum();
        assert!(second_half > first_half, "{second_half} <= {first_half}");
    }

    #[test]
    fn rejects_mismatched_side() {
        let encoder = PolarEncoder::new(16, 8, 32);
        let raster = solid_raster(16, [0, 0, 0]);
        assert!(encoder.encode_frame(&raster).is_err());
    }
}
